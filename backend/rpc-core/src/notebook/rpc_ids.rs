//! RPC identifiers of the notebook service.

pub const LIST_RECENTLY_VIEWED_PROJECTS: &str = "wXbhsf";
pub const CREATE_PROJECT: &str = "CCqFvf";
pub const GET_PROJECT: &str = "rLM1Ne";
pub const DELETE_PROJECTS: &str = "WWINqb";
pub const ADD_SOURCES: &str = "izAoDd";
pub const DELETE_SOURCES: &str = "tGMBJ";
pub const CREATE_NOTE: &str = "CYK0Xb";
pub const DELETE_NOTES: &str = "AH0mwd";
pub const GET_NOTES: &str = "cFji9";
pub const SHARE_AUDIO: &str = "RGP97b";
