use crate::domain::fees::FeeBreakdown;
use crate::domain::money::{ASSET_CODE, ASSET_SCALE, AssetAmount};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Quotes expire 5 minutes after creation.
pub const QUOTE_TTL_SECS: i64 = 300;
/// Incoming payments expire 1 hour after creation.
pub const INCOMING_PAYMENT_TTL_SECS: i64 = 3600;
/// Continuation wait hint handed out with every grant.
pub const GRANT_WAIT_SECS: u32 = 30;

/// Builds a protocol object id: `<prefix>_<unix millis>_<random>`.
fn protocol_id(prefix: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}_{}", Utc::now().timestamp_millis(), &token[..9])
}

fn random_token(len: usize) -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.push_str(&Uuid::new_v4().simple().to_string());
    token.truncate(len);
    token
}

/// A wallet-owning identity: a registered user or an ad-hoc recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn user(id: u64) -> Self {
        Self(id.to_string())
    }

    /// Fresh time-based token, so recipient wallets are always newly minted.
    pub fn recipient_token() -> Self {
        Self(format!(
            "recipient_{}_{}",
            Utc::now().timestamp_millis(),
            random_token(6)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A principal's payment endpoint. Immutable once created; the url derives
/// deterministically from the owner, so repeated lookups are idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    pub id: String,
    pub url: String,
    pub asset_code: String,
    pub asset_scale: u32,
    pub owner: PrincipalId,
    pub auth_server: String,
    pub created_at: DateTime<Utc>,
}

impl WalletAddress {
    pub fn for_principal(owner: PrincipalId, base_host: &str) -> Self {
        let url = format!("{base_host}/users/{owner}");
        Self {
            id: url.clone(),
            url,
            asset_code: ASSET_CODE.to_string(),
            asset_scale: ASSET_SCALE,
            owner,
            auth_server: format!("{base_host}/auth"),
            created_at: Utc::now(),
        }
    }
}

/// A priced offer translating a send amount into a receive amount.
/// Read-only after creation; referenced by at most one outgoing payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub sender_wallet: String,
    pub receiver_wallet: String,
    pub send_amount: AssetAmount,
    pub receive_amount: AssetAmount,
    pub fees: FeeBreakdown,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(sender: &WalletAddress, receiver: &WalletAddress, fees: FeeBreakdown) -> Self {
        let created_at = Utc::now();
        Self {
            id: protocol_id("quote"),
            sender_wallet: sender.url.clone(),
            receiver_wallet: receiver.url.clone(),
            send_amount: AssetAmount::usd(fees.amount),
            receive_amount: AssetAmount::usd(fees.recipient_receives),
            fees,
            created_at,
            expires_at: created_at + Duration::seconds(QUOTE_TTL_SECS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Receiver-side record of one payment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPayment {
    pub id: String,
    pub wallet_address: String,
    pub incoming_amount: AssetAmount,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IncomingPayment {
    pub fn new(receiver: &WalletAddress, receive_amount: Decimal) -> Self {
        let created_at = Utc::now();
        Self {
            id: protocol_id("incoming"),
            wallet_address: receiver.url.clone(),
            incoming_amount: AssetAmount::usd(receive_amount),
            completed: false,
            created_at,
            expires_at: created_at + Duration::seconds(INCOMING_PAYMENT_TTL_SECS),
        }
    }

    /// Flips `completed` false→true. Monotonic: returns false when the
    /// payment was already complete.
    pub fn complete(&mut self) -> bool {
        if self.completed {
            false
        } else {
            self.completed = true;
            true
        }
    }
}

/// Consent state of a grant. This design authorizes synchronously, but the
/// states are kept distinct so an interactive consent flow can be swapped in
/// without touching the session shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantState {
    PendingConsent,
    Authorized,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    pub token: String,
    pub uri: String,
    pub wait_secs: u32,
}

/// Authorization artifact permitting an outgoing payment to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: String,
    pub access_token: String,
    pub continuation: Continuation,
    pub state: GrantState,
    pub created_at: DateTime<Utc>,
}

impl Grant {
    pub fn request(sender: &WalletAddress) -> Self {
        let base = sender.auth_server.trim_end_matches("/auth");
        Self {
            id: protocol_id("grant"),
            access_token: format!("ilp_access_token_{}", random_token(20)),
            continuation: Continuation {
                token: format!("continue_{}", random_token(15)),
                uri: format!("{base}/continue"),
                wait_secs: GRANT_WAIT_SECS,
            },
            state: GrantState::PendingConsent,
            created_at: Utc::now(),
        }
    }

    pub fn authorize(&mut self) -> bool {
        if self.state == GrantState::PendingConsent {
            self.state = GrantState::Authorized;
            true
        } else {
            false
        }
    }

    pub fn deny(&mut self) -> bool {
        if self.state == GrantState::PendingConsent {
            self.state = GrantState::Denied;
            true
        } else {
            false
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.state == GrantState::Authorized
    }
}

/// Lifecycle of an outgoing payment. Transitions only move forward:
/// SENDING→COMPLETED or SENDING→FAILED, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Sending,
    Completed,
    Failed,
}

impl PaymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Completed | PaymentState::Failed)
    }
}

/// Sender-side record of one payment attempt, referencing its quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPayment {
    pub id: String,
    pub wallet_address: String,
    pub receiver: String,
    pub quote_id: String,
    pub state: PaymentState,
    pub sent_amount: AssetAmount,
    pub created_at: DateTime<Utc>,
}

impl OutgoingPayment {
    pub fn new(sender: &WalletAddress, incoming: &IncomingPayment, quote: &Quote) -> Self {
        Self {
            id: protocol_id("outgoing"),
            wallet_address: sender.url.clone(),
            receiver: incoming.id.clone(),
            quote_id: quote.id.clone(),
            state: PaymentState::Sending,
            sent_amount: AssetAmount::zero(),
            created_at: Utc::now(),
        }
    }

    /// SENDING→COMPLETED, stamping the sent amount. Returns false without
    /// touching the record when the payment is already terminal.
    pub fn complete(&mut self, sent: AssetAmount) -> bool {
        if self.state == PaymentState::Sending {
            self.state = PaymentState::Completed;
            self.sent_amount = sent;
            true
        } else {
            false
        }
    }

    /// SENDING→FAILED. Only reachable through explicit operator action;
    /// nothing in the core produces it automatically.
    pub fn fail(&mut self) -> bool {
        if self.state == PaymentState::Sending {
            self.state = PaymentState::Failed;
            true
        } else {
            false
        }
    }
}
