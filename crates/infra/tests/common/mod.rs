//! テスト共通フィクスチャ
//!
//! SMTP の最小限のコマンドに応答するスタブサーバー。
//! 受信したコマンドと DATA の中身を記録し、テストから参照できるようにする。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use std::{
    io,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use rcgen::CertifiedKey;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_rustls::{
    TlsAcceptor,
    rustls::{
        self,
        pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
    },
};

/// STARTTLS への応答
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartTls {
    /// EHLO で広告しない
    #[default]
    Disabled,
    /// 広告するが 454 で拒否する
    Refused,
    /// 広告し、自己署名証明書で実際に TLS へ切り替える
    SelfSigned,
}

/// スタブサーバーの振る舞い
#[derive(Debug, Clone, Default)]
pub struct StubOptions {
    pub starttls:          StartTls,
    /// RCPT TO を 550 で拒否するアドレス
    pub reject_recipients: Vec<String>,
}

#[derive(Debug, Default)]
struct Recorded {
    commands: Vec<String>,
    messages: Vec<String>,
}

/// 起動済みのスタブ SMTP サーバー
pub struct StubSmtpServer {
    pub addr: SocketAddr,
    recorded: Arc<Mutex<Recorded>>,
    handle:   JoinHandle<()>,
}

impl StubSmtpServer {
    pub async fn spawn(options: StubOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let acceptor = (options.starttls == StartTls::SelfSigned).then(self_signed_acceptor);

        let server_recorded = Arc::clone(&recorded);
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                if let Err(err) =
                    serve(socket, &options, acceptor.as_ref(), &server_recorded).await
                {
                    eprintln!("stub smtp server connection error: {err}");
                }
            }
        });

        Self {
            addr,
            recorded,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// 受信したコマンド（DATA の中身を除く）
    pub fn commands(&self) -> Vec<String> {
        self.recorded.lock().unwrap().commands.clone()
    }

    /// DATA で受信したメッセージ本体
    pub fn messages(&self) -> Vec<String> {
        self.recorded.lock().unwrap().messages.clone()
    }

    pub fn received_command(&self, prefix: &str) -> bool {
        self.commands()
            .iter()
            .any(|command| command.to_ascii_uppercase().starts_with(prefix))
    }
}

impl Drop for StubSmtpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// 1 接続分のやり取り
async fn serve(
    socket: TcpStream,
    options: &StubOptions,
    acceptor: Option<&TlsAcceptor>,
    recorded: &Mutex<Recorded>,
) -> io::Result<()> {
    let Next::Upgrade(socket) = converse(socket, options, false, recorded).await? else {
        return Ok(());
    };
    if let Some(acceptor) = acceptor {
        let tls = acceptor.accept(socket).await?;
        converse(tls, options, true, recorded).await?;
    }
    Ok(())
}

enum Next<S> {
    Closed,
    /// STARTTLS に 220 を返した。以降は TLS で続ける
    Upgrade(S),
}

async fn converse<S>(
    stream: S,
    options: &StubOptions,
    secure: bool,
    recorded: &Mutex<Recorded>,
) -> io::Result<Next<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);

    // TLS 確立後はクライアントが EHLO からやり直すため、挨拶は平文時のみ
    if !secure {
        stream.write_all(b"220 stub.smtp ESMTP ready\r\n").await?;
    }

    let mut in_data = false;
    let mut data = String::new();

    loop {
        let mut buf = String::new();
        if stream.read_line(&mut buf).await? == 0 {
            return Ok(Next::Closed);
        }
        let line = buf.trim_end_matches(['\r', '\n']).to_string();

        if in_data {
            if line == "." {
                in_data = false;
                recorded.lock().unwrap().messages.push(std::mem::take(&mut data));
                stream.write_all(b"250 2.0.0 queued\r\n").await?;
            } else {
                data.push_str(&line);
                data.push('\n');
            }
            continue;
        }

        recorded.lock().unwrap().commands.push(line.clone());
        let command = line.to_ascii_uppercase();

        let reply: String = if command.starts_with("EHLO") {
            let mut reply = String::from("250-stub.smtp\r\n250-8BITMIME\r\n");
            if !secure && options.starttls != StartTls::Disabled {
                reply.push_str("250-STARTTLS\r\n");
            }
            reply.push_str("250 AUTH PLAIN LOGIN\r\n");
            reply
        } else if command.starts_with("HELO") {
            "250 stub.smtp\r\n".to_string()
        } else if command == "STARTTLS" {
            if !secure && options.starttls == StartTls::SelfSigned {
                stream.write_all(b"220 2.0.0 ready to start TLS\r\n").await?;
                stream.flush().await?;
                return Ok(Next::Upgrade(stream.into_inner()));
            }
            "454 4.7.0 TLS not available\r\n".to_string()
        } else if command.starts_with("AUTH") {
            "235 2.7.0 Authentication successful\r\n".to_string()
        } else if command.starts_with("MAIL FROM") {
            "250 2.1.0 OK\r\n".to_string()
        } else if command.starts_with("RCPT TO") {
            let rejected = options
                .reject_recipients
                .iter()
                .any(|address| line.contains(address.as_str()));
            if rejected {
                "550 5.1.1 mailbox unavailable\r\n".to_string()
            } else {
                "250 2.1.5 OK\r\n".to_string()
            }
        } else if command == "DATA" {
            in_data = true;
            "354 end data with <CR><LF>.<CR><LF>\r\n".to_string()
        } else if command == "RSET" || command == "NOOP" {
            "250 2.0.0 OK\r\n".to_string()
        } else if command == "QUIT" {
            stream.write_all(b"221 2.0.0 bye\r\n").await?;
            return Ok(Next::Closed);
        } else {
            "502 5.5.2 command not recognized\r\n".to_string()
        };

        stream.write_all(reply.as_bytes()).await?;
    }
}

/// `localhost` 向けの自己署名証明書で TLS を受け付ける
///
/// クライアントは `127.0.0.1` に接続するため、ホスト名も一致しない。
fn self_signed_acceptor() -> TlsAcceptor {
    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert.der().clone()], key)
    .unwrap();

    TlsAcceptor::from(Arc::new(config))
}
