pub mod fits;
pub mod quicklook;
