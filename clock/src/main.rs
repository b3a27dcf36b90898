mod api;
mod host;
mod mqtt;
mod sim;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
