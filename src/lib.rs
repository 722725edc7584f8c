pub mod aggregate;
pub mod daterange;
pub mod db;
pub mod models;
pub mod normalize;
pub mod paginate;
pub mod playback;
pub mod report;
pub mod serve;
pub mod transcript;
