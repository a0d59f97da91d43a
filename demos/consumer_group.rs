use std::sync::Arc;
use std::time::Duration;

use commitlog_client::client::StartPosition;
use commitlog_client::ClientBuilder;
use tokio::signal::unix::SignalKind;
use tokio::sync::Notify;

#[tokio::main]
async fn main() {
    let brokers = vec!["0.0.0.0:9011".to_string()];
    let client = ClientBuilder::new(brokers).build().await.unwrap();

    let mut signal = tokio::signal::unix::signal(SignalKind::interrupt()).unwrap();
    let shutdown = Arc::new(Notify::new());
    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = signal.recv().await;
        signal_shutdown.notify_waiters();
    });

    let topics = client
        .list_topics()
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.name.starts_with("test"))
        .map(|t| t.name)
        .collect::<Vec<_>>();
    if topics.is_empty() {
        println!("no matched topic");
        return;
    }

    let consumer = client.grouped_consumer("test".to_string(), topics, true);
    consumer.connect().await.unwrap();

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.notified() => {
                consumer.close(None).await.unwrap();
                return;
            }
        }

        match consumer.consume(StartPosition::End, None).await {
            Ok(partitions) => {
                for (partition, result) in partitions {
                    match result {
                        Ok(records) => {
                            for record in records {
                                let msg = String::from_utf8_lossy(&record.value);
                                println!("recv record, {}/{}/{} -- {}", record.topic, record.partition, record.offset, msg);
                            }
                        }
                        Err(err) => println!("fetch failed for partition {partition}: {err}"),
                    }
                }
            }
            Err(err) => println!("fetch records failed: {err}"),
        }
    }
}
