use crate::common::*;

/// One retrieved sample: normalized image, label index, boolean defect mask,
/// and a reserved trailing field that is always zero.
pub type DataItem = (Tensor, i64, Tensor, i64);

/// The generic dataset trait.
pub trait GenericDataset
where
    Self: Debug,
{
    /// The number of color channels of the dataset.
    fn input_channels(&self) -> usize;

    /// The list of class names of the dataset.
    fn classes(&self) -> &IndexSet<String>;
}

/// The dataset that can be random accessed.
pub trait RandomAccessDataset
where
    Self: GenericDataset,
{
    /// Get number of records in the dataset.
    fn num_records(&self) -> usize;

    /// Get the nth record in the dataset.
    fn nth(&self, index: usize) -> Result<DataItem>;
}
