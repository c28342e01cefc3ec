use ragkb_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let client = RagClient::from_env()?;
    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Summarize the uploaded documents.".to_string());

    let mut stream = client.query_stream(QueryRequest::new(question).top_k(5))?;
    while let Some(event) = stream.next_event().await {
        match event? {
            StreamEvent::Sources(chunks) => {
                for chunk in &chunks {
                    eprintln!(
                        "[{:>3.0}%] {}",
                        chunk.clamped_score() * 100.0,
                        chunk.metadata_str("filename").unwrap_or("unknown")
                    );
                }
            }
            StreamEvent::Answer(text) => print!("{text}"),
            StreamEvent::Done => println!(),
            StreamEvent::Error(message) => eprintln!("backend error: {message}"),
            StreamEvent::Unknown { .. } => {}
        }
    }
    Ok(())
}
