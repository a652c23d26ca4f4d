use std::path::Path;
use sysinfo::Disks;

/// Free bytes on the volume holding `path`, when it can be determined
pub fn available_space(path: &Path) -> Option<u64> {
    let path = path.canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

pub fn has_enough_space(required: u64, available: u64) -> bool {
    available > required
}

/// Whole GiB, `<1` below one
pub fn gib_label(bytes: u64) -> String {
    match bytes / (1024 * 1024 * 1024) {
        0 => "<1".to_string(),
        n => n.to_string(),
    }
}
