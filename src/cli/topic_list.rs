use crate::core::topics::TOPICS;

pub fn list_topics() {
    println!("Available topics:");
    println!();
    for topic in TOPICS {
        println!("  {} {:<22} {:<12} {}", topic.icon, topic.title, topic.id, topic.description);
    }
    println!();
    println!("Start a chat on one with: dsa-tutor --topic <id>");
}
