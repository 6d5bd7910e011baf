//! Static list shown on the download tab

/// A file listed as downloadable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleDownload {
    pub name: &'static str,
    /// Human-readable size, e.g. "24.5 MB"
    pub size: &'static str,
    pub downloads: u32,
}

pub const SAMPLE_DOWNLOADS: &[SampleDownload] = &[
    SampleDownload {
        name: "software_v1.2.zip",
        size: "24.5 MB",
        downloads: 128,
    },
    SampleDownload {
        name: "utility_pack.zip",
        size: "8.7 MB",
        downloads: 76,
    },
    SampleDownload {
        name: "premium_tools.zip",
        size: "42.1 MB",
        downloads: 203,
    },
    SampleDownload {
        name: "resources.zip",
        size: "15.3 MB",
        downloads: 94,
    },
];
