use casewatch_server::{start, ServerArgs};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    start(ServerArgs::parse()).await
}
