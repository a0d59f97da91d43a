//! Drives a `GroupedConsumer` through a full join/assign/consume/commit/leave cycle against an
//! in-process fake broker speaking the real wire codec over a loopback socket, rather than a real
//! cluster. One broker, one topic ("orders"), one partition.

use std::io::Cursor;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use commitlog_client::client::StartPosition;
use commitlog_client::protocol::api_key::ApiKey;
use commitlog_client::protocol::messages::assignment::{
    ConsumerGroupMemberAssignment, ConsumerGroupMemberMetadata, PartitionAssignment,
};
use commitlog_client::protocol::messages::header::{RequestHeader, ResponseHeader};
use commitlog_client::protocol::record::{Message, Record, RecordSet, MAGIC_BYTE};
use commitlog_client::protocol::traits::WriteType;
use commitlog_client::protocol::traits::ReadType;
use commitlog_client::ClientBuilder;

const TOPIC: &str = "orders";
const GROUP: &str = "orders-consumers";
const MEMBER_ID: &str = "member-1";

// Response *writers* are hand-rolled here rather than via `WriteVersionedType`: the real client
// only ever reads these types, so `protocol::messages` carries no writer for them. Each function
// serializes fields in exactly the order the matching `ReadVersionedType::read_versioned` expects,
// the same way `connection::tests::loopback_messenger` assembles its canned `MetadataResponse`.

fn write_metadata_response(buf: &mut Vec<u8>, port: u16) {
    1i32.write(buf).unwrap(); // 1 broker
    1i32.write(buf).unwrap(); // node_id
    "127.0.0.1".to_string().write(buf).unwrap();
    (port as i32).write(buf).unwrap();

    1i32.write(buf).unwrap(); // 1 topic
    0i16.write(buf).unwrap(); // error
    TOPIC.to_string().write(buf).unwrap();
    1i32.write(buf).unwrap(); // 1 partition
    0i16.write(buf).unwrap(); // error
    0i32.write(buf).unwrap(); // partition_index
    1i32.write(buf).unwrap(); // leader_id
    1i32.write(buf).unwrap(); // 1 replica
    1i32.write(buf).unwrap();
    1i32.write(buf).unwrap(); // 1 isr
    1i32.write(buf).unwrap();
}

fn write_group_coordinator_response(buf: &mut Vec<u8>, port: u16) {
    0i16.write(buf).unwrap(); // error
    1i32.write(buf).unwrap(); // node_id
    "127.0.0.1".to_string().write(buf).unwrap();
    (port as i32).write(buf).unwrap();
}

fn write_join_group_response(buf: &mut Vec<u8>) {
    let metadata = ConsumerGroupMemberMetadata {
        version: 0,
        topics: vec![TOPIC.to_string()],
        user_data: vec![],
    };

    0i16.write(buf).unwrap(); // error
    1i32.write(buf).unwrap(); // generation_id
    "roundrobin".to_string().write(buf).unwrap(); // protocol_name
    MEMBER_ID.to_string().write(buf).unwrap(); // leader
    MEMBER_ID.to_string().write(buf).unwrap(); // member_id

    1i32.write(buf).unwrap(); // 1 member
    MEMBER_ID.to_string().write(buf).unwrap();
    metadata.encode().unwrap().write(buf).unwrap();
}

fn write_sync_group_response(buf: &mut Vec<u8>) {
    let assignment = ConsumerGroupMemberAssignment {
        version: 0,
        topics: vec![PartitionAssignment { topic: TOPIC.to_string(), partitions: vec![0] }],
        user_data: vec![],
    };

    0i16.write(buf).unwrap(); // error
    assignment.encode().unwrap().write(buf).unwrap();
}

fn write_offset_fetch_response(buf: &mut Vec<u8>) {
    1i32.write(buf).unwrap(); // 1 topic
    TOPIC.to_string().write(buf).unwrap();
    1i32.write(buf).unwrap(); // 1 partition
    0i32.write(buf).unwrap(); // partition_index
    (-1i64).write(buf).unwrap(); // committed_offset: none committed yet
    None::<String>.write(buf).unwrap(); // metadata
    0i16.write(buf).unwrap(); // error
}

fn write_list_offsets_response(buf: &mut Vec<u8>) {
    1i32.write(buf).unwrap(); // 1 topic
    TOPIC.to_string().write(buf).unwrap();
    1i32.write(buf).unwrap(); // 1 partition
    0i32.write(buf).unwrap(); // partition_index
    0i16.write(buf).unwrap(); // error
    1i32.write(buf).unwrap(); // 1 offset
    0i64.write(buf).unwrap();
}

fn write_fetch_response(buf: &mut Vec<u8>) {
    let message = Message {
        magic: MAGIC_BYTE,
        compression: commitlog_client::compression::Compression::None,
        key: None,
        value: Some(b"order placed".to_vec()),
    };
    let record_set = RecordSet(vec![Record { offset: 0, message }]);
    let mut record_bytes = Vec::new();
    record_set.write_uncompressed(&mut record_bytes).unwrap();

    1i32.write(buf).unwrap(); // 1 topic
    TOPIC.to_string().write(buf).unwrap();
    1i32.write(buf).unwrap(); // 1 partition
    0i32.write(buf).unwrap(); // partition_index
    0i16.write(buf).unwrap(); // error
    1i64.write(buf).unwrap(); // high_watermark
    record_bytes.write(buf).unwrap();
}

fn write_offset_commit_response(buf: &mut Vec<u8>) {
    1i32.write(buf).unwrap(); // 1 topic
    TOPIC.to_string().write(buf).unwrap();
    1i32.write(buf).unwrap(); // 1 partition
    0i32.write(buf).unwrap(); // partition_index
    0i16.write(buf).unwrap(); // error
}

fn write_leave_group_response(buf: &mut Vec<u8>) {
    0i16.write(buf).unwrap();
}

async fn serve(listener: TcpListener, port: u16) {
    loop {
        let Ok((socket, _)) = listener.accept().await else { return };
        tokio::spawn(serve_connection(socket, port));
    }
}

async fn serve_connection(mut socket: TcpStream, port: u16) {
    loop {
        let mut len_buf = [0u8; 4];
        if socket.read_exact(&mut len_buf).await.is_err() {
            return;
        }
        let len = i32::from_be_bytes(len_buf) as usize;
        let mut request = vec![0u8; len];
        if socket.read_exact(&mut request).await.is_err() {
            return;
        }

        let mut cursor = Cursor::new(&request[..]);
        let header = RequestHeader::read(&mut cursor).unwrap();

        let mut payload = Vec::new();
        ResponseHeader { correlation_id: header.correlation_id }.write(&mut payload).unwrap();

        match header.api_key {
            ApiKey::Metadata => write_metadata_response(&mut payload, port),
            ApiKey::GroupCoordinator => write_group_coordinator_response(&mut payload, port),
            ApiKey::JoinGroup => write_join_group_response(&mut payload),
            ApiKey::SyncGroup => write_sync_group_response(&mut payload),
            ApiKey::OffsetFetch => write_offset_fetch_response(&mut payload),
            ApiKey::ListOffsets => write_list_offsets_response(&mut payload),
            ApiKey::Fetch => write_fetch_response(&mut payload),
            ApiKey::OffsetCommit => write_offset_commit_response(&mut payload),
            ApiKey::LeaveGroup => write_leave_group_response(&mut payload),
            other => panic!("fake broker received unexpected request kind: {other:?}"),
        }

        let mut framed = Vec::with_capacity(payload.len() + 4);
        (payload.len() as i32).write(&mut framed).unwrap();
        framed.extend_from_slice(&payload);
        if socket.write_all(&framed).await.is_err() {
            return;
        }
    }
}

#[tokio::test]
async fn grouped_consumer_joins_fetches_and_commits() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(listener, port));

    let client = ClientBuilder::new(vec![format!("127.0.0.1:{port}")]).build().await.unwrap();

    let consumer = client.grouped_consumer(GROUP.to_string(), vec![TOPIC.to_string()], true);
    consumer.connect().await.unwrap();

    let assignment = consumer.assignment().await;
    assert_eq!(assignment.get(TOPIC), Some(&vec![0]));

    let mut records = consumer.consume(StartPosition::Beginning, None).await.unwrap();
    assert_eq!(records.len(), 1);
    let partition = records.remove(&0).expect("partition 0 in result map").unwrap();
    assert_eq!(partition.len(), 1);
    assert_eq!(partition[0].topic, TOPIC);
    assert_eq!(partition[0].partition, 0);
    assert_eq!(partition[0].offset, 0);
    assert_eq!(partition[0].value, b"order placed");

    consumer.close(None).await.unwrap();
}
