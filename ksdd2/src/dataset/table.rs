use crate::common::*;

/// The three parallel containers of a materialized split, treated as one
/// indexed relation: images, masks and product identifiers always have the
/// same length and are only ever reordered together through [select](Self::select).
#[derive(Debug)]
pub struct SampleTable {
    samples: Tensor,
    masks: Tensor,
    product_ids: Vec<String>,
}

impl SampleTable {
    pub fn new(samples: Tensor, masks: Tensor, product_ids: Vec<String>) -> Result<Self> {
        ensure!(
            samples.size().len() == 4 && samples.size()[1] == 3,
            "samples must have shape (N, 3, H, W), got {:?}",
            samples.size()
        );
        ensure!(
            masks.size().len() == 3,
            "masks must have shape (N, H, W), got {:?}",
            masks.size()
        );
        ensure!(
            samples.size()[0] == masks.size()[0]
                && samples.size()[0] == product_ids.len() as i64,
            "container lengths diverge: {} samples, {} masks, {} product ids",
            samples.size()[0],
            masks.size()[0],
            product_ids.len()
        );
        ensure!(
            samples.size()[2..] == masks.size()[1..],
            "sample and mask spatial sizes diverge: {:?} vs {:?}",
            samples.size(),
            masks.size()
        );

        Ok(Self {
            samples,
            masks,
            product_ids,
        })
    }

    pub fn len(&self) -> usize {
        self.product_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty()
    }

    pub fn samples(&self) -> &Tensor {
        &self.samples
    }

    pub fn masks(&self) -> &Tensor {
        &self.masks
    }

    pub fn product_ids(&self) -> &[String] {
        &self.product_ids
    }

    /// The raw `(3, H, W)` image at `index`, prior to normalization.
    pub fn image(&self, index: i64) -> Tensor {
        self.samples.i(index)
    }

    /// The `(H, W)` integer mask at `index`.
    pub fn mask(&self, index: i64) -> Tensor {
        self.masks.i(index)
    }

    pub fn product_id(&self, index: usize) -> &str {
        &self.product_ids[index]
    }

    /// Split the index range by label: `(positive, negative)`, where a
    /// sample is positive iff its mask has at least one nonzero pixel.
    pub fn partition_by_label(&self) -> (Vec<i64>, Vec<i64>) {
        (0..self.len() as i64).partition(|&index| {
            self.masks.i(index).sum(Kind::Int64).int64_value(&[]) != 0
        })
    }

    /// Reindex all three containers with the same index list, preserving the
    /// lockstep invariant by construction.
    pub fn select(&self, indices: &[i64]) -> Result<Self> {
        let len = self.len() as i64;
        ensure!(
            indices.iter().all(|&index| (0..len).contains(&index)),
            "selection index out of range 0..{}",
            len
        );

        let selector = Tensor::of_slice(indices);
        let samples = self.samples.index_select(0, &selector);
        let masks = self.masks.index_select(0, &selector);
        let product_ids = indices
            .iter()
            .map(|&index| self.product_ids[index as usize].clone())
            .collect();

        Self::new(samples, masks, product_ids)
    }
}
