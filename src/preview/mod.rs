// Composite output encoding for snapshots and thumbnails.

pub mod compress;
