//! Bridges the `metrics` facade used across jobwatch into an OpenTelemetry meter, so counters and
//! histograms recorded with `counter!` / `histogram!` leave the process through the OTLP exporter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use metrics::{
    Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{self as otel, Meter};

#[derive(Clone)]
struct Description {
    text: String,
    unit: Option<Unit>,
}

/// `metrics::Recorder` that creates one OpenTelemetry instrument per metric name and attaches the
/// facade labels as attributes on every measurement.
pub struct MeterRecorder {
    meter: Meter,
    descriptions: Mutex<HashMap<String, Description>>,
    counters: Mutex<HashMap<String, otel::Counter<u64>>>,
    histograms: Mutex<HashMap<String, otel::Histogram<f64>>>,
    gauges: Mutex<HashMap<String, otel::Gauge<f64>>>,
}

impl MeterRecorder {
    pub fn new(meter: Meter) -> Self {
        Self {
            meter,
            descriptions: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
            gauges: Mutex::new(HashMap::new()),
        }
    }

    fn describe(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        lock(&self.descriptions).insert(
            key.as_str().to_string(),
            Description {
                text: description.to_string(),
                unit,
            },
        );
    }

    fn description(&self, name: &str) -> Option<Description> {
        lock(&self.descriptions).get(name).cloned()
    }

    fn counter(&self, name: &str) -> otel::Counter<u64> {
        lock(&self.counters)
            .entry(name.to_string())
            .or_insert_with(|| {
                let mut builder = self.meter.u64_counter(name.to_string());
                if let Some(description) = self.description(name) {
                    builder = builder.with_description(description.text);
                    if let Some(unit) = description.unit {
                        builder = builder.with_unit(unit.as_canonical_label());
                    }
                }
                builder.build()
            })
            .clone()
    }

    fn histogram(&self, name: &str) -> otel::Histogram<f64> {
        lock(&self.histograms)
            .entry(name.to_string())
            .or_insert_with(|| {
                let mut builder = self.meter.f64_histogram(name.to_string());
                if let Some(description) = self.description(name) {
                    builder = builder.with_description(description.text);
                    if let Some(unit) = description.unit {
                        builder = builder.with_unit(unit.as_canonical_label());
                    }
                }
                builder.build()
            })
            .clone()
    }

    fn gauge(&self, name: &str) -> otel::Gauge<f64> {
        lock(&self.gauges)
            .entry(name.to_string())
            .or_insert_with(|| {
                let mut builder = self.meter.f64_gauge(name.to_string());
                if let Some(description) = self.description(name) {
                    builder = builder.with_description(description.text);
                }
                builder.build()
            })
            .clone()
    }
}

// A poisoned map still holds valid instruments.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn attributes(key: &Key) -> Vec<KeyValue> {
    key.labels()
        .map(|label| KeyValue::new(label.key().to_string(), label.value().to_string()))
        .collect()
}

impl Recorder for MeterRecorder {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.describe(key, unit, description);
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.describe(key, unit, description);
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.describe(key, unit, description);
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CounterHandle {
            instrument: self.counter(key.name()),
            attributes: attributes(key),
            last_absolute: AtomicU64::new(0),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(GaugeHandle {
            instrument: self.gauge(key.name()),
            attributes: attributes(key),
            value: AtomicU64::new(0f64.to_bits()),
        }))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(HistogramHandle {
            instrument: self.histogram(key.name()),
            attributes: attributes(key),
        }))
    }
}

struct CounterHandle {
    instrument: otel::Counter<u64>,
    attributes: Vec<KeyValue>,
    last_absolute: AtomicU64,
}

impl CounterFn for CounterHandle {
    fn increment(&self, value: u64) {
        self.instrument.add(value, &self.attributes);
    }

    /// OpenTelemetry counters only take deltas; the growth since the last absolute value is added.
    fn absolute(&self, value: u64) {
        let previous = self.last_absolute.fetch_max(value, Ordering::AcqRel);
        if value > previous {
            self.instrument.add(value - previous, &self.attributes);
        }
    }
}

struct GaugeHandle {
    instrument: otel::Gauge<f64>,
    attributes: Vec<KeyValue>,
    value: AtomicU64,
}

impl GaugeHandle {
    fn update(&self, apply: impl Fn(f64) -> f64) {
        let mut current = self.value.load(Ordering::Acquire);
        loop {
            let next = apply(f64::from_bits(current));
            match self.value.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.instrument.record(next, &self.attributes);
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl GaugeFn for GaugeHandle {
    fn increment(&self, value: f64) {
        self.update(|current| current + value);
    }

    fn decrement(&self, value: f64) {
        self.update(|current| current - value);
    }

    fn set(&self, value: f64) {
        self.update(|_| value);
    }
}

struct HistogramHandle {
    instrument: otel::Histogram<f64>,
    attributes: Vec<KeyValue>,
}

impl HistogramFn for HistogramHandle {
    fn record(&self, value: f64) {
        self.instrument.record(value, &self.attributes);
    }
}
