use commitlog_client::ClientBuilder;

#[tokio::main]
async fn main() {
    let brokers = vec!["0.0.0.0:9011".to_string()];
    let client = ClientBuilder::new(brokers).build().await.unwrap();

    let topics = client.list_topics().await.unwrap();
    for topic in &topics {
        println!("TOPIC: {}", topic.name);
        for (partition, info) in &topic.partitions {
            println!("  PARTITION {partition}  leader={}", info.leader_id);
        }
    }

    let groups = client.list_groups().await.unwrap();
    if groups.is_empty() {
        println!("No groups available");
        return;
    }

    let group_ids = groups.iter().map(|g| g.group_id.clone()).collect();
    let described = client.describe_groups(group_ids).await.unwrap();

    for group in described {
        println!("GROUP_ID:       {}", group.group_id);
        println!("GROUP_STATE:    {}", group.group_state);
        println!("PROTOCOL_TYPE:  {}", group.protocol_type);
        for member in group.members {
            println!("  MEMBER_ID:    {}", member.member_id);
            println!("  CLIENT_ID:    {}", member.client_id);
            println!("  CLIENT_HOST:  {}", member.client_host);
        }
        println!();
    }
}
