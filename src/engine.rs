use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::core::context::{ContextBuilder, SharedContext};
use crate::error::EngineError;
use crate::models::MarketData;
use crate::strategies::consolidator::consolidate;
use crate::strategies::duplicate_guard::{DuplicateGuard, DuplicateState};
use crate::strategies::layers::{evaluate_all, evaluate_all_parallel};
use crate::strategies::signals::FinalSignal;

/// One signal engine per instrument. Evaluation is synchronous; the only
/// state kept between calls is the duplicate guard.
pub struct Engine {
    cfg: EngineConfig,
    guard: Mutex<DuplicateGuard>,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        info!(
            "Signal engine ready: symbol={} parallel_layers={} light_pa_buy={}",
            cfg.symbol, cfg.parallel_layers, cfg.light_pa_buy_enabled
        );
        Self {
            cfg,
            guard: Mutex::new(DuplicateGuard::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Snapshot of the last accepted signal, if any.
    pub fn last_accepted(&self) -> Option<DuplicateState> {
        self.guard.lock().last().cloned()
    }

    /// Validates the four series, builds the shared context and decides.
    /// Only malformed input is an error; every other outcome is a
    /// [`FinalSignal`], NO_TRADE included.
    pub fn evaluate(&self, data: &MarketData) -> Result<FinalSignal, EngineError> {
        let ctx = ContextBuilder::new(&self.cfg).build(data)?;
        debug!(
            "[ENGINE] context at {:.2}: bias={} momentum={} breakout_hh={}",
            ctx.price, ctx.bias, ctx.momentum.confidence, ctx.breakout_hh
        );
        Ok(self.decide(&ctx, data))
    }

    /// Runs the layers and the consolidator over a prebuilt context.
    pub fn decide(&self, ctx: &SharedContext, data: &MarketData) -> FinalSignal {
        let candidates = if self.cfg.parallel_layers {
            evaluate_all_parallel(ctx, data, &self.cfg)
        } else {
            evaluate_all(ctx, data, &self.cfg)
        };

        let decision = {
            let mut guard = self.guard.lock();
            consolidate(ctx, &candidates, &mut guard, &self.cfg)
        };

        let signal = FinalSignal::assemble(ctx, decision, candidates);
        if signal.is_trade() {
            info!(
                "[SIGNAL] {} {} @ {:.2} | SL {:.2} | TP1 {:.2} | conf {:.0} | {}",
                self.cfg.symbol,
                signal.action,
                signal.entry.unwrap_or_default(),
                signal.sl.unwrap_or_default(),
                signal.tp1.unwrap_or_default(),
                signal.confidence,
                signal.reason
            );
        } else {
            debug!("[SIGNAL] NO_TRADE: {}", signal.reason);
        }
        signal
    }
}
