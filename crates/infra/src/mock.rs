//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリのメール送信実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! buildmail-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use buildmail_domain::notification::{EmailMessage, NotificationError};

use crate::notification::{MailConnector, MailSession};

#[derive(Default)]
struct MockState {
    sent:        Vec<EmailMessage>,
    /// 送信を試みた宛先（失敗を含む、試行順）
    attempted:   Vec<String>,
    dial_count:  usize,
    close_count: usize,
    fail_dial:   bool,
    /// 何回目（1 始まり）の送信を失敗させるか
    fail_on:     Option<usize>,
}

// ===== MockMailConnector =====

/// 送信内容を記録するモック接続
///
/// `Clone` しても状態は共有されるため、サービスに渡した後でも
/// テスト側から記録を参照できる。
#[derive(Clone, Default)]
pub struct MockMailConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockMailConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// dial を失敗させる
    pub fn failing_dial() -> Self {
        let connector = Self::new();
        connector.state.lock().unwrap().fail_dial = true;
        connector
    }

    /// `attempt` 回目（1 始まり）の送信を失敗させる
    pub fn failing_on_send(attempt: usize) -> Self {
        let connector = Self::new();
        connector.state.lock().unwrap().fail_on = Some(attempt);
        connector
    }

    /// 送信に成功したメッセージ
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    /// 送信を試みた回数（失敗を含む）
    pub fn send_attempts(&self) -> usize {
        self.state.lock().unwrap().attempted.len()
    }

    /// 送信を試みた宛先を試行順に返す（失敗した宛先を含む）
    pub fn attempted_recipients(&self) -> Vec<String> {
        self.state.lock().unwrap().attempted.clone()
    }

    pub fn dial_count(&self) -> usize {
        self.state.lock().unwrap().dial_count
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().close_count
    }
}

#[async_trait]
impl MailConnector for MockMailConnector {
    async fn dial(&self) -> Result<Box<dyn MailSession>, NotificationError> {
        let mut state = self.state.lock().unwrap();
        state.dial_count += 1;
        if state.fail_dial {
            return Err(NotificationError::ConnectionFailed(
                "connection refused".to_string(),
            ));
        }
        Ok(Box::new(MockMailSession {
            state: Arc::clone(&self.state),
        }))
    }
}

// ===== MockMailSession =====

struct MockMailSession {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl MailSession for MockMailSession {
    async fn send_email(&mut self, email: &EmailMessage) -> Result<(), NotificationError> {
        let mut state = self.state.lock().unwrap();
        state.attempted.push(email.to.clone());
        if state.fail_on == Some(state.attempted.len()) {
            return Err(NotificationError::SendFailed {
                recipient: email.to.clone(),
                reason:    "451 temporary failure".to_string(),
            });
        }
        state.sent.push(email.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.state.lock().unwrap().close_count += 1;
    }
}
