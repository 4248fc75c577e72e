//! Protocol constants

use std::time::Duration;

/// Control (JSON-RPC) channel port
pub const CONTROL_PORT: u16 = 4700;

/// Image stream port of the telephoto camera
pub const IMAGE_PORT: u16 = 4800;

/// Image stream port of the wide-angle camera
pub const IMAGE_PORT_WIDE: u16 = 4804;

/// RTSP port of the telephoto live video feed
pub const RTSP_PORT: u16 = 4554;

/// RTSP port of the wide-angle live video feed
pub const RTSP_PORT_WIDE: u16 = 4555;

/// Address of the device's own Wi-Fi hotspot
pub const FALLBACK_HOST: &str = "10.0.0.1";

/// mDNS name the device announces on a shared network
pub const DISCOVERY_HOST: &str = "seestar.local";

/// Upper bound on resolving [`DISCOVERY_HOST`]
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Socket send/receive buffer size used by the vendor app (64KB)
pub const SOCKET_BUFFER_SIZE: u32 = 65536;

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Control channel heartbeat period
pub const CONTROL_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Image channel heartbeat period (matches the vendor app)
pub const STREAM_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(4);

/// Fixed delay before the listener reconnects
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Upper bound on waiting for session tasks to exit
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest control line accepted before the connection is considered broken
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Longest JSON line skipped while resynchronizing an image stream
pub const MAX_SKIPPED_LINE: usize = 4096;

/// Capacity of the event history ring
pub const HISTORY_CAPACITY: usize = 500;

/// Binary frame header constants
pub mod frame {
    /// Header size in bytes
    pub const HEADER_SIZE: usize = 34;

    /// Start-of-frame marker (963)
    pub const MAGIC: u16 = 0x03C3;

    /// First byte of the magic on the wire
    pub const MAGIC_HI: u8 = 0x03;

    /// Second byte of the magic on the wire
    pub const MAGIC_LO: u8 = 0xC3;

    /// `img_type` of a single unstacked preview frame
    pub const IMG_TYPE_PREVIEW: u8 = 1;

    /// `img_type` of a progressively stacked image
    pub const IMG_TYPE_STACKED: u8 = 5;
}

/// Embedded archive (ZIP local entry) layout
pub mod archive {
    /// Local-entry signature `PK\x03\x04`
    pub const LOCAL_ENTRY_SIG: [u8; 4] = *b"PK\x03\x04";

    /// Fixed part of a local entry header
    pub const LOCAL_ENTRY_LEN: usize = 30;

    /// Offset of the file name length (LE u16)
    pub const NAME_LEN_OFFSET: usize = 26;

    /// Offset of the extra field length (LE u16)
    pub const EXTRA_LEN_OFFSET: usize = 28;
}

/// Auto-stretch parameters
pub mod stretch {
    /// Black point percentile
    pub const BLACK_PERCENTILE: f64 = 0.5;

    /// White point percentile
    pub const WHITE_PERCENTILE: f64 = 99.95;

    /// Midtone balance (lower is more aggressive)
    pub const MIDTONE: f64 = 0.15;

    /// Guards the normalisation against a zero range
    pub const EPSILON: f64 = 1e-6;
}

/// JSON-RPC method names used by the link layer
pub mod methods {
    pub const TEST_CONNECTION: &str = "test_connection";
    pub const BEGIN_STREAMING: &str = "begin_streaming";
    pub const STOP_STREAMING: &str = "stop_streaming";
    pub const GET_STACKED_IMG: &str = "get_stacked_img";
    pub const GET_CURRENT_IMG: &str = "get_current_img";
    pub const GET_DEVICE_STATE: &str = "get_device_state";
    pub const GET_APP_STATE: &str = "iscope_get_app_state";
    pub const GET_EQU_COORD: &str = "scope_get_equ_coord";
    pub const GET_HORIZ_COORD: &str = "scope_get_horiz_coord";
}
