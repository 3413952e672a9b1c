pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use indexmap::IndexSet;
pub use itertools::{chain, Itertools as _};
pub use log::{info, warn};
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
pub use tch::{
    kind::{FLOAT_CPU, INT64_CPU},
    Device, IndexOp, Kind, Tensor,
};
