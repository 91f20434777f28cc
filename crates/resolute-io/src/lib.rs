pub mod nifti_io;
pub mod dicom_io;

pub use nifti_io::{read_nifti, write_histogram_nifti, write_nifti};
pub use dicom_io::{identify_ute_series, load_dicom_series, scan_dicom_directory, DicomSeriesInfo, UteSeries};
