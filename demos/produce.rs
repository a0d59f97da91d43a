use std::sync::Arc;
use std::time::Duration;

use commitlog_client::{Client, ClientBuilder};
use serde::Serialize;

const TOPIC: &str = "test";

#[derive(Serialize)]
struct Payload {
    partition_hint: i32,
    index: u64,
    message: String,
}

#[tokio::main]
async fn main() {
    let brokers = vec!["localhost:9010".to_string(), "localhost:9011".to_string()];
    let client = Arc::new(ClientBuilder::new(brokers).build().await.unwrap());

    tokio::spawn(produce_loop(client.clone(), 0));
    tokio::spawn(produce_loop(client.clone(), 1));
    tokio::spawn(produce_loop(client.clone(), 2));

    tokio::time::sleep(Duration::from_secs(10000)).await;
}

async fn produce_loop(client: Arc<Client>, worker: i32) {
    let producer = client.producer();
    let key = format!("worker-{worker}");

    let mut index = 0u64;
    loop {
        let payload = Payload { partition_hint: worker, index, message: format!("hello: {worker} {index}") };

        let ack = producer.produce(TOPIC, &payload, Some(key.as_bytes()), None).await.unwrap();
        index += 1;

        println!("partition: {}, offset: {}", ack.partition, ack.offset);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
