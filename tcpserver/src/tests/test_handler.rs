//! 메시지 핸들러 테스트
//!
//! 입장, 수 처리, 중복 요청, 에러 응답, 게임 종료 흐름을 연결 단위로 검증합니다.

use serde_json::json;

use super::{start_game, TestServer};

/// 두 플레이어 입장 → 게임 시작 테스트
#[tokio::test]
async fn test_two_joins_start_game() {
    let server = TestServer::new();
    let mut p1 = server.connect();
    let mut p2 = server.connect();

    p1.send("PLAYER_JOINED", json!({"player_id": "p1", "nickname": "alice"})).await;
    let waiting = p1.recv_type("GAME_STATE").await;
    assert_eq!(waiting.payload["status"], "WAITING");
    assert_eq!(waiting.payload["next_player_id"], serde_json::Value::Null);
    assert_eq!(waiting.game_id, "G-1");
    assert_eq!(waiting.protocol_version, "1.0");

    p2.send("PLAYER_JOINED", json!({"player_id": "p2", "nickname": "bob"})).await;
    let private = p2.recv_type("GAME_STATE").await;
    let broadcast_p2 = p2.recv_type("GAME_STATE").await;
    let broadcast_p1 = p1.recv_type("GAME_STATE").await;

    for state in [&private, &broadcast_p1, &broadcast_p2] {
        assert_eq!(state.payload["status"], "IN_PROGRESS");
        assert_eq!(state.payload["next_player_id"], "p1");
        assert_eq!(state.payload["version"], 0);
    }

    let players = &broadcast_p1.payload["players"];
    assert_eq!(players[0], json!({"player_id": "p1", "nickname": "alice", "symbol": "X", "seat": 0}));
    assert_eq!(players[1], json!({"player_id": "p2", "nickname": "bob", "symbol": "O", "seat": 1}));

    println!("✅ 두 플레이어 입장 테스트 통과");
}

/// 중앙 수 적용 테스트
#[tokio::test]
async fn test_center_move_is_acknowledged_and_broadcast() {
    let server = TestServer::new();
    let (mut p1, mut p2) = start_game(&server).await;

    p1.send("MOVE", json!({"player_id": "p1", "x": 1, "y": 1, "turn": 0, "msg_id": "m-1"})).await;

    let ack = p1.recv_type("MOVE_OK").await;
    assert_eq!(ack.payload["version"], 1);
    assert_eq!(ack.payload["board"][1][1], "X");

    for client in [&mut p1, &mut p2] {
        let state = client.recv_type("GAME_STATE").await;
        assert_eq!(state.payload["board"][1][1], "X");
        assert_eq!(state.payload["turn"], 1);
        assert_eq!(state.payload["version"], 1);
        assert_eq!(state.payload["next_player_id"], "p2");
    }

    println!("✅ 중앙 수 적용 테스트 통과");
}

/// 중복 MOVE 요청 재전송 테스트
#[tokio::test]
async fn test_duplicate_move_replays_identical_response() {
    let server = TestServer::new();
    let (mut p1, mut p2) = start_game(&server).await;

    let payload = json!({"player_id": "p1", "x": 0, "y": 0, "turn": 0, "msg_id": "dup-1"});
    p1.send("MOVE", payload.clone()).await;
    let first = p1.recv_type("MOVE_OK").await;
    p1.recv_type("GAME_STATE").await;
    p2.recv_type("GAME_STATE").await;

    p1.send("MOVE", payload).await;
    let replayed = p1.recv_type("MOVE_OK").await;
    assert_eq!(replayed, first);
    assert_eq!(replayed.to_bytes().unwrap(), first.to_bytes().unwrap());

    // 상태는 바뀌지 않고 브로드캐스트도 없음
    p1.expect_silence().await;
    p2.expect_silence().await;
    assert_eq!(server.room.version(), 1);

    println!("✅ 중복 요청 재전송 테스트 통과");
}

/// msg_id가 없으면 envelope ID로 중복을 판단
#[tokio::test]
async fn test_envelope_id_is_dedupe_fallback() {
    let server = TestServer::new();
    let (mut p1, _p2) = start_game(&server).await;

    let sent = p1.send("MOVE", json!({"player_id": "p1", "x": 2, "y": 2})).await;
    let first = p1.recv_type("MOVE_OK").await;
    p1.recv_type("GAME_STATE").await;

    // 같은 envelope을 그대로 재전송
    let bytes = sent.to_bytes().unwrap();
    p1.send_raw(&bytes).await;
    assert_eq!(p1.recv_type("MOVE_OK").await, first);
    p1.expect_silence().await;

    println!("✅ envelope ID 중복 판단 테스트 통과");
}

/// 차례가 아닌 플레이어의 수 거부 테스트
#[tokio::test]
async fn test_wrong_player_gets_not_your_turn() {
    let server = TestServer::new();
    let (mut p1, mut p2) = start_game(&server).await;

    p2.send("MOVE", json!({"player_id": "p2", "x": 0, "y": 0, "turn": 0, "msg_id": "w-1"})).await;
    assert_eq!(p2.recv_error_code().await, "NOT_YOUR_TURN");

    // 다른 플레이어에게는 아무것도 전송되지 않음
    p1.expect_silence().await;
    assert_eq!(server.room.version(), 0);

    println!("✅ 차례 위반 거부 테스트 통과");
}

/// 규칙 위반별 에러 코드 테스트
#[tokio::test]
async fn test_rule_violations_report_codes() {
    let server = TestServer::new();
    let (mut p1, mut p2) = start_game(&server).await;

    p1.send("MOVE", json!({"player_id": "p1", "x": 3, "y": 0, "msg_id": "a"})).await;
    assert_eq!(p1.recv_error_code().await, "OUT_OF_BOUNDS");

    p1.send("MOVE", json!({"player_id": "p1", "x": 0, "y": 0, "turn": 5, "msg_id": "b"})).await;
    assert_eq!(p1.recv_error_code().await, "TURN_MISMATCH");

    p1.send("MOVE", json!({"player_id": "p1", "x": 0, "y": 0, "turn": 0, "msg_id": "c"})).await;
    p1.recv_type("MOVE_OK").await;
    p1.recv_type("GAME_STATE").await;
    p2.recv_type("GAME_STATE").await;

    p2.send("MOVE", json!({"player_id": "p2", "x": 0, "y": 0, "turn": 1, "msg_id": "d"})).await;
    assert_eq!(p2.recv_error_code().await, "CELL_TAKEN");

    println!("✅ 규칙 위반 에러 코드 테스트 통과");
}

/// 알 수 없는 타입과 잘못된 payload 테스트
#[tokio::test]
async fn test_protocol_violations_keep_connection_open() {
    let server = TestServer::new();
    let mut client = server.connect();

    client.send("CHAT", json!({"text": "hi"})).await;
    assert_eq!(client.recv_error_code().await, "BAD_TYPE");

    client.send("MOVE", json!({"player_id": "p1", "x": "center"})).await;
    assert_eq!(client.recv_error_code().await, "BAD_PAYLOAD");

    client.send_raw(b"\x00\x00\x00\x05hello").await;
    assert_eq!(client.recv_error_code().await, "BAD_PAYLOAD");

    // 연결은 유지됨
    client.send("PING", json!({})).await;
    client.recv_type("PONG").await;

    println!("✅ 프로토콜 위반 처리 테스트 통과");
}

/// 게임 시작 전 수는 NOT_IN_PROGRESS
#[tokio::test]
async fn test_move_before_start_is_rejected() {
    let server = TestServer::new();
    let mut p1 = server.connect();

    p1.send("PLAYER_JOINED", json!({"player_id": "p1", "nickname": "alice"})).await;
    p1.recv_type("GAME_STATE").await;

    p1.send("MOVE", json!({"player_id": "p1", "x": 0, "y": 0})).await;
    assert_eq!(p1.recv_error_code().await, "NOT_IN_PROGRESS");

    println!("✅ 시작 전 수 거부 테스트 통과");
}

/// 세 번째 플레이어 입장 거부 테스트
#[tokio::test]
async fn test_third_player_gets_room_full() {
    let server = TestServer::new();
    let (_p1, _p2) = start_game(&server).await;

    let mut p3 = server.connect();
    p3.send("PLAYER_JOINED", json!({"player_id": "p3", "nickname": "carol"})).await;
    assert_eq!(p3.recv_error_code().await, "ROOM_FULL");
    assert!(!server.connection_service.is_bound("p3"));

    println!("✅ 방 가득 참 테스트 통과");
}

/// 윗줄 완성 → GAME_OVER 테스트
#[tokio::test]
async fn test_top_row_win_ends_game() {
    let server = TestServer::new();
    let (mut p1, mut p2) = start_game(&server).await;

    let moves = [("p1", 0, 0), ("p2", 0, 1), ("p1", 1, 0), ("p2", 1, 1)];
    for (turn, (player, x, y)) in moves.into_iter().enumerate() {
        let mover = if player == "p1" { &mut p1 } else { &mut p2 };
        mover
            .send("MOVE", json!({"player_id": player, "x": x, "y": y, "turn": turn, "msg_id": format!("t-{}", turn)}))
            .await;
        mover.recv_type("MOVE_OK").await;
        p1.recv_type("GAME_STATE").await;
        p2.recv_type("GAME_STATE").await;
    }

    p1.send("MOVE", json!({"player_id": "p1", "x": 2, "y": 0, "turn": 4, "msg_id": "t-4"})).await;
    p1.recv_type("MOVE_OK").await;

    for client in [&mut p1, &mut p2] {
        let over = client.recv_type("GAME_OVER").await;
        assert_eq!(over.payload["result"], "X_WIN");
        assert_eq!(over.payload["winning_line"], json!([[0, 0], [1, 0], [2, 0]]));
        assert_eq!(over.payload["final_state"]["status"], "GAME_OVER");
        assert_eq!(over.payload["final_state"]["next_player_id"], serde_json::Value::Null);
        assert_eq!(over.payload["final_state"]["version"], 5);
    }

    // 게임 종료 후의 수는 거부
    p2.send("MOVE", json!({"player_id": "p2", "x": 2, "y": 2, "msg_id": "late"})).await;
    assert_eq!(p2.recv_error_code().await, "NOT_IN_PROGRESS");

    println!("✅ 승리 판정 테스트 통과");
}

/// 입장하지 않은 연결도 PING에 PONG으로 응답
#[tokio::test]
async fn test_ping_without_join() {
    let server = TestServer::new();
    let mut client = server.connect();

    client.send("PING", json!({})).await;
    let pong = client.recv_type("PONG").await;
    assert_eq!(pong.payload, json!({}));

    println!("✅ 미입장 PING 테스트 통과");
}

/// ID 없는 MOVE는 중복으로 취급되지 않음
#[tokio::test]
async fn test_moves_without_any_id_are_each_applied() {
    let server = TestServer::new();
    let (mut p1, mut p2) = start_game(&server).await;

    let frame = |x: i64, y: i64, player: &str| {
        let body = json!({"type": "MOVE", "payload": {"player_id": player, "x": x, "y": y}}).to_string();
        let mut bytes = (body.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(body.as_bytes());
        bytes
    };

    p1.send_raw(&frame(0, 0, "p1")).await;
    assert_eq!(p1.recv_type("MOVE_OK").await.payload["version"], 1);
    p1.recv_type("GAME_STATE").await;
    p2.recv_type("GAME_STATE").await;

    p2.send_raw(&frame(1, 0, "p2")).await;
    assert_eq!(p2.recv_type("MOVE_OK").await.payload["version"], 2);
    p1.recv_type("GAME_STATE").await;
    p2.recv_type("GAME_STATE").await;

    // 같은 플레이어의 두 번째 수도 새 요청으로 적용
    p1.send_raw(&frame(2, 2, "p1")).await;
    let ack = p1.recv_type("MOVE_OK").await;
    assert_eq!(ack.payload["version"], 3);
    assert_eq!(ack.payload["board"][2][2], "X");
    assert_eq!(server.room.version(), 3);

    println!("✅ ID 없는 수 적용 테스트 통과");
}

/// 다른 플레이어로 바인딩된 연결은 그 플레이어 대신 둘 수 없음
#[tokio::test]
async fn test_bound_connection_cannot_move_for_other_player() {
    let server = TestServer::new();
    let (mut p1, mut p2) = start_game(&server).await;

    p2.send("MOVE", json!({"player_id": "p1", "x": 0, "y": 0, "turn": 0, "msg_id": "i-1"})).await;
    assert_eq!(p2.recv_error_code().await, "BAD_PAYLOAD");
    p1.expect_silence().await;
    assert_eq!(server.room.version(), 0);

    // 실제 p1은 같은 msg_id로 정상적으로 둘 수 있음
    p1.send("MOVE", json!({"player_id": "p1", "x": 0, "y": 0, "turn": 0, "msg_id": "i-1"})).await;
    assert_eq!(p1.recv_type("MOVE_OK").await.payload["version"], 1);

    println!("✅ 타인 대리 수 거부 테스트 통과");
}
