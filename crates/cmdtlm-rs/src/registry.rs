// crates/cmdtlm-rs/src/registry.rs

//! Name to factory lookup for the `LIMITS_RESPONSE` and `PROCESSOR` keywords.
//!
//! Handlers are registered up front under an upper-cased class name,
//! optionally scoped to a target as `TARGET/NAME`. A scoped entry wins over
//! a global one of the same name.

use crate::packets::{LimitsState, PacketItem, Value};
use core::fmt::Debug;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Reacts to limits state transitions of one telemetry item.
pub trait LimitsResponse: Debug + Send + Sync {
    fn call(
        &self,
        target_name: &str,
        packet_name: &str,
        item: &PacketItem,
        old_state: Option<LimitsState>,
        new_state: LimitsState,
    );

    /// Configuration line that recreates this response.
    fn to_config(&self) -> String;
}

/// Derives values from the items of a telemetry packet each time it is received.
pub trait Processor: Debug + Send {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: &str);

    /// Feeds one received sample (item name to converted value).
    fn call(&mut self, values: &BTreeMap<String, Value>);

    /// Current derived values keyed by result name.
    fn results(&self) -> BTreeMap<String, Value>;

    fn reset(&mut self);

    /// Configuration line that recreates this processor.
    fn to_config(&self) -> String;

    fn clone_box(&self) -> Box<dyn Processor>;
}

impl Clone for Box<dyn Processor> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub type LimitsResponseFactory = fn(&[String]) -> Result<Box<dyn LimitsResponse>, String>;
pub type ProcessorFactory = fn(&[String]) -> Result<Box<dyn Processor>, String>;

#[derive(Debug, Clone)]
pub struct Registry {
    limits_responses: BTreeMap<String, LimitsResponseFactory>,
    processors: BTreeMap<String, ProcessorFactory>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_limits_response("LOG_RESPONSE", LogResponse::create);
        registry.register_processor("WATERMARK_PROCESSOR", WatermarkProcessor::create);
        registry.register_processor("STATISTICS_PROCESSOR", StatisticsProcessor::create);
        registry
    }
}

impl Registry {
    /// A registry with the built-in handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            limits_responses: BTreeMap::new(),
            processors: BTreeMap::new(),
        }
    }

    pub fn register_limits_response(&mut self, name: &str, factory: LimitsResponseFactory) {
        self.limits_responses.insert(class_key(name), factory);
    }

    pub fn register_processor(&mut self, name: &str, factory: ProcessorFactory) {
        self.processors.insert(class_key(name), factory);
    }

    pub fn create_limits_response(
        &self,
        target_name: Option<&str>,
        class_name: &str,
        args: &[String],
    ) -> Result<Arc<dyn LimitsResponse>, String> {
        let factory = lookup(&self.limits_responses, target_name, class_name)?;
        factory(args).map(Arc::from)
    }

    pub fn create_processor(
        &self,
        target_name: Option<&str>,
        class_name: &str,
        args: &[String],
    ) -> Result<Box<dyn Processor>, String> {
        let factory = lookup(&self.processors, target_name, class_name)?;
        factory(args)
    }
}

/// `watermark_processor.rb` and `WATERMARK_PROCESSOR` name the same class.
fn class_key(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    match name.rsplit_once('/') {
        Some((scope, _)) => format!("{}/{}", scope.to_ascii_uppercase(), stem.to_ascii_uppercase()),
        None => stem.to_ascii_uppercase(),
    }
}

fn lookup<F: Copy>(
    map: &BTreeMap<String, F>,
    target_name: Option<&str>,
    class_name: &str,
) -> Result<F, String> {
    let key = class_key(class_name);
    if let Some(target) = target_name {
        let scoped = format!("{}/{}", target.to_ascii_uppercase(), key);
        if let Some(factory) = map.get(&scoped) {
            return Ok(*factory);
        }
    }
    map.get(&key)
        .copied()
        .ok_or_else(|| format!("{} class not found.", key))
}

/// Logs every limits transition at warn level (info when returning to green).
#[derive(Debug, Default)]
pub struct LogResponse;

impl LogResponse {
    fn create(args: &[String]) -> Result<Box<dyn LimitsResponse>, String> {
        if !args.is_empty() {
            return Err(format!("LOG_RESPONSE takes no options, given {}", args.len()));
        }
        Ok(Box::new(LogResponse))
    }
}

impl LimitsResponse for LogResponse {
    fn call(
        &self,
        target_name: &str,
        packet_name: &str,
        item: &PacketItem,
        old_state: Option<LimitsState>,
        new_state: LimitsState,
    ) {
        let ctx = crate::log::PacketContext {
            target_name,
            packet_name,
        };
        let old = old_state.map(|s| s.to_string()).unwrap_or_else(|| "NONE".into());
        match new_state {
            LimitsState::Green | LimitsState::GreenLow | LimitsState::GreenHigh | LimitsState::Blue => {
                pkt_debug!(ctx, "{} limits {} -> {}", item.name, old, new_state)
            }
            _ => ::log::warn!(
                "[{} {}] {} limits {} -> {}",
                target_name,
                packet_name,
                item.name,
                old,
                new_state
            ),
        }
    }

    fn to_config(&self) -> String {
        "    LIMITS_RESPONSE LOG_RESPONSE\n".to_string()
    }
}

/// Tracks the highest and lowest value seen for one item.
#[derive(Debug, Clone)]
pub struct WatermarkProcessor {
    name: String,
    item_name: String,
    high_water: Option<f64>,
    low_water: Option<f64>,
}

impl WatermarkProcessor {
    fn create(args: &[String]) -> Result<Box<dyn Processor>, String> {
        let [item_name] = args else {
            return Err(format!(
                "WATERMARK_PROCESSOR expects <ITEM NAME>, given {} option(s)",
                args.len()
            ));
        };
        Ok(Box::new(WatermarkProcessor {
            name: String::new(),
            item_name: item_name.to_ascii_uppercase(),
            high_water: None,
            low_water: None,
        }))
    }
}

impl Processor for WatermarkProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_ascii_uppercase();
    }

    fn call(&mut self, values: &BTreeMap<String, Value>) {
        let Some(value) = values.get(&self.item_name).and_then(Value::as_f64) else {
            return;
        };
        self.high_water = Some(self.high_water.map_or(value, |h| h.max(value)));
        self.low_water = Some(self.low_water.map_or(value, |l| l.min(value)));
    }

    fn results(&self) -> BTreeMap<String, Value> {
        let mut results = BTreeMap::new();
        if let Some(h) = self.high_water {
            results.insert("HIGH_WATER".to_string(), Value::Float(h));
        }
        if let Some(l) = self.low_water {
            results.insert("LOW_WATER".to_string(), Value::Float(l));
        }
        results
    }

    fn reset(&mut self) {
        self.high_water = None;
        self.low_water = None;
    }

    fn to_config(&self) -> String {
        format!("  PROCESSOR {} WATERMARK_PROCESSOR {}\n", self.name, self.item_name)
    }

    fn clone_box(&self) -> Box<dyn Processor> {
        Box::new(self.clone())
    }
}

/// Running statistics over the last N samples of one item.
#[derive(Debug, Clone)]
pub struct StatisticsProcessor {
    name: String,
    item_name: String,
    samples_to_average: usize,
    samples: VecDeque<f64>,
}

impl StatisticsProcessor {
    fn create(args: &[String]) -> Result<Box<dyn Processor>, String> {
        let [item_name, samples] = args else {
            return Err(format!(
                "STATISTICS_PROCESSOR expects <ITEM NAME> <SAMPLES TO AVERAGE>, given {} option(s)",
                args.len()
            ));
        };
        let samples_to_average = samples
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("Invalid samples to average: {}", samples))?;
        Ok(Box::new(StatisticsProcessor {
            name: String::new(),
            item_name: item_name.to_ascii_uppercase(),
            samples_to_average,
            samples: VecDeque::with_capacity(samples_to_average),
        }))
    }
}

impl Processor for StatisticsProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_ascii_uppercase();
    }

    fn call(&mut self, values: &BTreeMap<String, Value>) {
        let Some(value) = values.get(&self.item_name).and_then(Value::as_f64) else {
            return;
        };
        if self.samples.len() == self.samples_to_average {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn results(&self) -> BTreeMap<String, Value> {
        let mut results = BTreeMap::new();
        if self.samples.is_empty() {
            return results;
        }
        let n = self.samples.len() as f64;
        let mean = self.samples.iter().sum::<f64>() / n;
        let variance = self.samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let max = self.samples.iter().copied().fold(f64::MIN, f64::max);
        let min = self.samples.iter().copied().fold(f64::MAX, f64::min);
        results.insert("MAX".to_string(), Value::Float(max));
        results.insert("MIN".to_string(), Value::Float(min));
        results.insert("MEAN".to_string(), Value::Float(mean));
        results.insert("STDDEV".to_string(), Value::Float(variance.sqrt()));
        results.insert("SAMPLES".to_string(), Value::Int(self.samples.len() as i128));
        results
    }

    fn reset(&mut self) {
        self.samples.clear();
    }

    fn to_config(&self) -> String {
        format!(
            "  PROCESSOR {} STATISTICS_PROCESSOR {} {}\n",
            self.name, self.item_name, self.samples_to_average
        )
    }

    fn clone_box(&self) -> Box<dyn Processor> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, v: f64) -> BTreeMap<String, Value> {
        let mut m = BTreeMap::new();
        m.insert(name.to_string(), Value::Float(v));
        m
    }

    #[test]
    fn test_class_key_normalizes_filenames() {
        assert_eq!(class_key("watermark_processor.rb"), "WATERMARK_PROCESSOR");
        assert_eq!(class_key("inst/my_response.py"), "INST/MY_RESPONSE");
        assert_eq!(class_key("LOG_RESPONSE"), "LOG_RESPONSE");
    }

    #[test]
    fn test_unknown_class() {
        let registry = Registry::new();
        let err = registry
            .create_processor(Some("INST"), "missing_processor", &[])
            .unwrap_err();
        assert_eq!(err, "MISSING_PROCESSOR class not found.");
    }

    #[test]
    fn test_target_scope_wins() {
        fn scoped(_: &[String]) -> Result<Box<dyn LimitsResponse>, String> {
            Err("scoped".to_string())
        }
        let mut registry = Registry::new();
        registry.register_limits_response("INST/LOG_RESPONSE", scoped);
        let err = registry
            .create_limits_response(Some("inst"), "log_response", &[])
            .unwrap_err();
        assert_eq!(err, "scoped");
        assert!(registry.create_limits_response(Some("OTHER"), "log_response", &[]).is_ok());
    }

    #[test]
    fn test_watermark_processor() {
        let registry = Registry::new();
        let mut p = registry
            .create_processor(None, "WATERMARK_PROCESSOR", &["temp".to_string()])
            .unwrap();
        p.set_name("temp_water");
        p.call(&sample("TEMP", 5.0));
        p.call(&sample("TEMP", -2.0));
        p.call(&sample("OTHER", 100.0));
        let results = p.results();
        assert_eq!(results["HIGH_WATER"], Value::Float(5.0));
        assert_eq!(results["LOW_WATER"], Value::Float(-2.0));
        assert_eq!(p.to_config(), "  PROCESSOR TEMP_WATER WATERMARK_PROCESSOR TEMP\n");
        let copy = p.clone();
        p.reset();
        assert!(p.results().is_empty());
        assert_eq!(copy.results()["HIGH_WATER"], Value::Float(5.0));
    }

    #[test]
    fn test_statistics_processor_window() {
        let registry = Registry::new();
        let mut p = registry
            .create_processor(None, "statistics_processor", &["v".into(), "2".into()])
            .unwrap();
        for v in [1.0, 3.0, 5.0] {
            p.call(&sample("V", v));
        }
        let results = p.results();
        assert_eq!(results["MEAN"], Value::Float(4.0));
        assert_eq!(results["MIN"], Value::Float(3.0));
        assert_eq!(results["SAMPLES"], Value::Int(2));
        assert!(
            registry
                .create_processor(None, "statistics_processor", &["v".into(), "0".into()])
                .is_err()
        );
    }
}
