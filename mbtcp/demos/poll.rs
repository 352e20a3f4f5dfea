use std::error::Error;
use std::time::Duration;

use mbtcp::prelude::*;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:502".to_string())
        .parse()?;

    let config = ClientConfig::new(target)
        .response_timeout(Duration::from_secs(1))
        .echo_writes(true)
        .decode(DecodeLevel::new(
            PduDecodeLevel::DataValues,
            AduDecodeLevel::Header,
            PhysDecodeLevel::Nothing,
        ));

    let (channel, mut events) = spawn_client_task(config, 4);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{event}");
        }
    });

    channel.write_multiple_registers(0, vec![1, 2, 3]).await?;

    loop {
        // failures are reported as events, keep polling
        let _ = channel.read_holding_registers(0, 3).await;
        let _ = channel.read_discrete_inputs(0, 10).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}
