use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::strategies::signals::FinalSignal;

/// Receives BUY/SELL signals. Delivery is up to the implementor.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, symbol: &str, signal: &FinalSignal) -> Result<()>;
}

/// Alert text for a trade; `None` for NO_TRADE.
pub fn format_message(symbol: &str, signal: &FinalSignal) -> Option<String> {
    let levels = signal.levels().filter(|_| signal.is_trade())?;
    let layer = signal.layer.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string());
    Some(format!(
        "{action} {symbol} ({layer})\n\
         Entry: {entry:.2}\n\
         SL:    {sl:.2}\n\
         TP1:   {tp1:.2}\n\
         TP2:   {tp2:.2}\n\
         TP3:   {tp3:.2}\n\
         Confidence: {conf:.0}\n\
         Bias: {bias}\n\
         Reason: {reason}",
        action = signal.action,
        entry = levels.entry,
        sl = levels.sl,
        tp1 = levels.tp1,
        tp2 = levels.tp2,
        tp3 = levels.tp3,
        conf = signal.confidence,
        bias = signal.bias,
        reason = signal.reason,
    ))
}

/// Writes the alert to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, symbol: &str, signal: &FinalSignal) -> Result<()> {
        if let Some(text) = format_message(symbol, signal) {
            info!("[ALERT] {}", text.replace('\n', " | "));
        }
        Ok(())
    }
}
