mod ops;
mod serialize;
