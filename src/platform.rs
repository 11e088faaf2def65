use std::fs::Metadata;

use crate::model::SizeMetric;

pub type DeviceId = u64;

pub fn metric_bytes(metadata: &Metadata, metric: SizeMetric) -> u64 {
    match metric {
        SizeMetric::Apparent => metadata.len(),
        SizeMetric::Allocated => allocated_size(metadata),
    }
}

#[cfg(not(windows))]
pub fn allocated_size(metadata: &Metadata) -> u64 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        // st_blocks is always in 512-byte units regardless of st_blksize.
        let blocks = metadata.blocks();
        if blocks > 0 {
            return blocks.saturating_mul(512);
        }
    }

    metadata.len()
}

#[cfg(windows)]
pub fn allocated_size(metadata: &Metadata) -> u64 {
    const CLUSTER: u64 = 4096;
    metadata.len().div_ceil(CLUSTER) * CLUSTER
}

#[cfg(unix)]
pub fn device_id(metadata: &Metadata) -> Option<DeviceId> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
pub fn device_id(_metadata: &Metadata) -> Option<DeviceId> {
    None
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn apparent_metric_is_file_length() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("f.bin");
        fs::write(&path, vec![0_u8; 300]).expect("write");
        let meta = fs::metadata(&path).expect("meta");

        assert_eq!(metric_bytes(&meta, SizeMetric::Apparent), 300);
        assert!(metric_bytes(&meta, SizeMetric::Allocated) > 0);
    }

    #[cfg(unix)]
    #[test]
    fn entries_of_one_directory_share_a_device() {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir(temp.path().join("sub")).expect("mkdir");
        let root = fs::metadata(temp.path()).expect("root meta");
        let sub = fs::metadata(temp.path().join("sub")).expect("sub meta");
        assert_eq!(device_id(&root), device_id(&sub));
    }
}
