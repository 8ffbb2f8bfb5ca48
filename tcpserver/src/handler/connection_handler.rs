//! 연결 핸들러
//!
//! 소켓 하나의 수명 동안 읽기 루프와 쓰기 태스크를 운영합니다.
//! 읽기 루프는 종료 신호, EOF, 프레이밍 에러 중 하나가 오면 끝나고
//! 그 연결이 여전히 플레이어에 묶여 있을 때만 바인딩을 해제합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::handler::message_handler::{ConnectionState, MessageHandler};
use crate::protocol::Envelope;
use crate::service::connection_service::{wait_until_closed, CloseRx, ConnectionService, OutboundRx};
use crate::tool::error::TcpResult;

/// 연결 핸들러
pub struct ConnectionHandler {
    connection_service: Arc<ConnectionService>,
    message_handler: Arc<MessageHandler>,
    max_frame_bytes: usize,
}

impl ConnectionHandler {
    pub fn new(
        connection_service: Arc<ConnectionService>,
        message_handler: Arc<MessageHandler>,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            connection_service,
            message_handler,
            max_frame_bytes,
        }
    }

    /// 새로운 TCP 연결 처리
    pub async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> TcpResult<()> {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP_NODELAY 설정 실패 ({}): {}", addr, e);
        }

        let (reader, writer) = stream.into_split();
        self.serve(BufReader::new(reader), BufWriter::new(writer), addr.to_string()).await
    }

    /// 임의의 바이트 스트림 위에서 연결을 처리합니다.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W, addr: String) -> TcpResult<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (handle, outbound_rx, mut close_rx) = self.connection_service.register_connection(addr)?;
        let conn_id = handle.conn_id();
        info!("새 클라이언트 연결 {} ({})", conn_id, handle.addr());

        let writer_task = tokio::spawn(Self::write_loop(writer, outbound_rx, close_rx.clone(), conn_id));

        let mut state = ConnectionState::Connected;
        let result = loop {
            tokio::select! {
                _ = wait_until_closed(&mut close_rx) => {
                    debug!("연결 {} 종료 신호 수신", conn_id);
                    break Ok(());
                }
                inbound = Envelope::read_from_stream(&mut reader, self.max_frame_bytes) => match inbound {
                    Ok(inbound) => self.message_handler.handle_inbound(&handle, &mut state, inbound).await,
                    Err(e) if e.is_disconnect() => break Ok(()),
                    Err(e) => {
                        warn!("연결 {} 읽기 실패: {}", conn_id, e);
                        break Err(e);
                    }
                },
            }
        };

        self.connection_service.release_connection(&handle, state.player_id());
        state = ConnectionState::Closed;

        if let Err(e) = writer_task.await {
            warn!("연결 {} 쓰기 태스크 비정상 종료: {}", conn_id, e);
        }

        info!("클라이언트 연결 {} 해제 ({:?})", conn_id, state);
        result
    }

    /// 쓰기 루프
    ///
    /// 대기 중인 메시지를 먼저 모두 쓰고, 종료 신호가 오면 소켓을 닫습니다.
    async fn write_loop<W>(mut writer: W, mut outbound_rx: OutboundRx, mut close_rx: CloseRx, conn_id: u64)
    where
        W: AsyncWrite + Unpin,
    {
        loop {
            tokio::select! {
                biased;
                next = outbound_rx.recv() => match next {
                    Some(envelope) => {
                        if let Err(e) = envelope.write_to_stream(&mut writer).await {
                            debug!("연결 {} 쓰기 실패: {}", conn_id, e);
                            break;
                        }
                    }
                    None => break,
                },
                _ = wait_until_closed(&mut close_rx) => break,
            }
        }

        if let Err(e) = writer.shutdown().await {
            debug!("연결 {} 종료 처리 실패: {}", conn_id, e);
        }
    }
}
