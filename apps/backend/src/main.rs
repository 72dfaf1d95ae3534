#[tokio::main]
async fn main() -> anyhow::Result<()> {
    study_drill_backend::run().await
}
