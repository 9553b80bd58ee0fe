//! Memory-derived launch flags for the IBM JRE.

use jre_memory::MemorySize;

/// Fraction of the memory budget given to the heap; the rest covers thread
/// stacks, class metadata and native allocations.
pub const HEAP_SIZE_RATIO: f64 = 0.75;

/// Budgets strictly below this disable compressed references.
pub const COMPRESSED_REFERENCES_THRESHOLD: MemorySize = MemorySize::from_mib(512);

pub const NO_COMPRESSED_REFERENCES: &str = "-Xnocompressedrefs";
pub const TUNE_VIRTUALIZED: &str = "-Xtune:virtualized";

/// Launch flags for a memory budget, in the order they must be appended.
///
/// Without a budget the JVM picks its own heap size and only the
/// compressed-references and virtualization flags are emitted. A zero budget
/// still yields `-Xmx0`.
pub fn memory_opts(budget: Option<MemorySize>) -> Vec<String> {
    let Some(budget) = budget else {
        return vec![
            NO_COMPRESSED_REFERENCES.to_owned(),
            TUNE_VIRTUALIZED.to_owned(),
        ];
    };

    let mut opts = Vec::with_capacity(3);
    if budget < COMPRESSED_REFERENCES_THRESHOLD {
        opts.push(NO_COMPRESSED_REFERENCES.to_owned());
    }
    opts.push(TUNE_VIRTUALIZED.to_owned());
    opts.push(format!("-Xmx{}", budget * HEAP_SIZE_RATIO));
    opts
}
