use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    act_cli::main_entry().await
}
