use crate::SharedIndex;
use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric},
    metrics::{gauge::ConstGauge, MetricType},
    registry::Registry,
};

#[derive(Debug)]
struct Instrumented(SharedIndex);

pub fn register(reg: &mut Registry, index: SharedIndex) {
    reg.register_collector(Box::new(Instrumented(index)));
}

impl Collector for Instrumented {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> Result<(), std::fmt::Error> {
        let this = self.0.read();

        let mut size_encoder = encoder.encode_descriptor(
            "index_size",
            "The number of resources in the index",
            None,
            MetricType::Gauge,
        )?;
        for (namespace, index) in this.namespaces() {
            for (kind, size) in index.sizes() {
                let labels = vec![("namespace", namespace), ("kind", kind)];
                let size = ConstGauge::new(size as u32);
                size.encode(size_encoder.encode_family(&labels)?)?;
            }
        }

        Ok(())
    }
}
