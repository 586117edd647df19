//! RTMP timestamps are unsigned 32 bit millisecond counters from an
//! unspecified epoch.  Streams can outlive the 32 bit range, so all timestamp
//! arithmetic wraps modulo 2^32 and ordering follows the RTMP adjacency rule:
//! two times are comparable directly when they are within 2^31 - 1
//! milliseconds of each other, otherwise the smaller raw value is considered
//! to have wrapped past the larger one.
//!
//! ```
//! use rsl_rtmp::time::RtmpTimestamp;
//!
//! let early = RtmpTimestamp::new(10000);
//! let late = RtmpTimestamp::new(4000000000);
//!
//! // 10000 is "after" 4000000000 once wrapping is considered
//! assert!(early > late);
//! assert_eq!(late + 300000000, 5032704);
//! ```

use std::cmp::{max, min, Ordering};
use std::num::Wrapping;
use std::ops::{Add, Sub};

const MAX_ADJACENT_VALUE: u32 = (1 << 31) - 1;

/// A wrapping RTMP timestamp value
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub struct RtmpTimestamp {
    /// Milliseconds from an unspecified epoch
    pub value: u32,
}

impl RtmpTimestamp {
    pub fn new(initial_value: u32) -> Self {
        RtmpTimestamp {
            value: initial_value,
        }
    }

    pub fn set(&mut self, new_value: u32) {
        self.value = new_value;
    }
}

impl Add for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: RtmpTimestamp) -> Self {
        RtmpTimestamp {
            value: (Wrapping(self.value) + Wrapping(other.value)).0,
        }
    }
}

impl Add<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: u32) -> Self {
        self + RtmpTimestamp::new(other)
    }
}

impl Sub for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: RtmpTimestamp) -> Self {
        RtmpTimestamp {
            value: (Wrapping(self.value) - Wrapping(other.value)).0,
        }
    }
}

impl Sub<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: u32) -> Self {
        self - RtmpTimestamp::new(other)
    }
}

impl Ord for RtmpTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.value, other.value)
    }
}

impl PartialOrd for RtmpTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(compare(self.value, other.value))
    }
}

impl PartialEq<u32> for RtmpTimestamp {
    fn eq(&self, other: &u32) -> bool {
        self.value == *other
    }
}

impl PartialOrd<u32> for RtmpTimestamp {
    fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
        Some(compare(self.value, *other))
    }
}

fn compare(value1: u32, value2: u32) -> Ordering {
    let difference = max(value1, value2) - min(value1, value2);
    if difference <= MAX_ADJACENT_VALUE {
        value1.cmp(&value2)
    } else {
        value2.cmp(&value1)
    }
}
