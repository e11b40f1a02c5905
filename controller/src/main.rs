mod host;
mod pwm;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
