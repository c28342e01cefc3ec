use ragkb_client::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let client = RagClient::from_env()?;

    let health = client.health().await?;
    eprintln!("{} {} ({})", health.app_name, health.version, health.status);

    let response = client
        .query(QueryRequest::new("What topics do my documents cover?"))
        .await?;
    println!("{}", response.answer);
    eprintln!(
        "{} sources in {:.2}s",
        response.sources.len(),
        response.processing_time
    );
    Ok(())
}
