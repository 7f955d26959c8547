//! ReceiptScan - receipt capture and OCR
//!
//! Captures a still from a camera source, shrinks it for upload, and sends it to
//! a cloud OCR service for text extraction. The `receipt-scan` binary is a thin
//! command line front end over [`pipeline::Pipeline`].

pub mod capture;
pub mod config;
pub mod ocr;
pub mod pipeline;
pub mod vision;
