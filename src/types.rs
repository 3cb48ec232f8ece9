use std::{collections::HashMap, fmt::Display};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::DropReason;

/// Euler angles or position vector as sent by the viewer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Pose and size request decoded from a viewer frame. Field names match the
/// wire format: `w`/`h` are the desired image size, `p` and `r` the camera
/// position and Euler rotation, `m` the projection matrix in row-major order,
/// `f` the follow flag and `t` the touch flag.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ImageRequest {
    pub w: u32,
    pub h: u32,
    pub p: Vector3,
    pub r: Vector3,
    pub m: [f32; 16],
    pub f: bool,
    pub t: bool,
}

/// Data holder for one streaming tick: the encoded image produced for the
/// viewer, loggable statistics and the reason the tick was dropped, if any.
#[derive(Default, Clone, Debug)]
pub struct TickData {
    encoded_image: Option<Bytes>,

    stats: HashMap<String, u128>,

    drop_reason: Option<DropReason>,
}

impl TickData {
    //*******//
    // Stats //
    //*******//

    pub fn set(&mut self, key: &str, value: u128) {
        self.stats.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> u128 {
        *self
            .stats
            .get(key)
            .unwrap_or_else(|| panic!("{}", missing_key_msg(key)))
    }

    pub fn has(&self, key: &str) -> bool {
        self.stats.contains_key(key)
    }

    pub fn get_stats(&self) -> &HashMap<String, u128> {
        &self.stats
    }

    //*******//
    // Image //
    //*******//

    pub fn insert_encoded_image(&mut self, image: Bytes) {
        self.encoded_image = Some(image);
    }

    pub fn extract_encoded_image(&mut self) -> Option<Bytes> {
        self.encoded_image.take()
    }

    pub fn has_encoded_image(&self) -> bool {
        self.encoded_image.is_some()
    }

    //*************//
    // Drop reason //
    //*************//

    pub fn set_drop_reason(&mut self, reason: Option<DropReason>) {
        self.drop_reason = reason;
    }

    pub fn get_drop_reason(&self) -> Option<DropReason> {
        self.drop_reason
    }

    //*******//
    // Other //
    //*******//

    pub fn clone_without_image(&self) -> Self {
        Self {
            stats: self.stats.clone(),
            drop_reason: self.drop_reason,

            ..Default::default()
        }
    }
}

fn missing_key_msg(key: &str) -> String {
    format!("Missing key '{}'", key)
}

impl Display for TickData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ Encoded image bytes: {:?}, Stats: {:?}, Drop reason: {:?} }}",
            self.encoded_image.as_ref().map(|image| image.len()),
            self.stats,
            self.drop_reason
        )
    }
}
