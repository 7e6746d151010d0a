//! Aggregates (reducers) for Gatherly.

pub mod attendance;

pub use attendance::{
    AttendanceAction, AttendanceEnvironment, AttendanceError, AttendanceReducer, AttendanceState,
};
