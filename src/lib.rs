pub mod psd;
