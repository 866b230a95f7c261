use anyhow::Context;

fn main() -> anyhow::Result<()> {
    qrforge::run()
        .inspect_err(|e| tracing::error!(error = %e, "qrforge failed"))
        .context("qrforge failed")
}
