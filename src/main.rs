#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nal2_caller::run().await
}
