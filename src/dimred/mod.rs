//! # Dimensionality Reduction
//!
//! Linear reductions applied to the two modalities before they are handed to a model.
//!
//! ## Currently Available
//! - **PCA** ([`pca`]): standardized expression profiles → principal component scores
//! - **LSI** ([`lsi`]): accessibility counts → TF-IDF weighted SVD embedding
//!
//! Both go through the same [`SVDImplementation`](crate::svd::SVDImplementation) seam and share
//! the component-count rules in [`resolve_components`].

use anyhow::bail;

use crate::error::PreprocessError;

pub mod lsi;
pub mod pca;

/// Decides how many components a reduction keeps.
///
/// `None` keeps every available component. A request above `available` is an error unless
/// `clamp` is set, in which case it is lowered to `available`.
pub fn resolve_components(
    requested: Option<usize>,
    available: usize,
    clamp: bool,
) -> anyhow::Result<usize> {
    match requested {
        None => Ok(available),
        Some(0) => bail!(PreprocessError::InvalidComponents),
        Some(k) if k > available => {
            if clamp {
                log::warn!(
                    "Requested {} components but only {} are available, clamping",
                    k,
                    available
                );
                Ok(available)
            } else {
                bail!(PreprocessError::TooManyComponents {
                    requested: k,
                    available,
                })
            }
        }
        Some(k) => Ok(k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_components() {
        assert_eq!(resolve_components(None, 7, false).unwrap(), 7);
        assert_eq!(resolve_components(Some(3), 7, false).unwrap(), 3);
        assert_eq!(resolve_components(Some(7), 7, false).unwrap(), 7);
        assert_eq!(resolve_components(Some(100), 7, true).unwrap(), 7);

        let err = resolve_components(Some(100), 7, false).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreprocessError>(),
            Some(&PreprocessError::TooManyComponents {
                requested: 100,
                available: 7
            })
        );

        let err = resolve_components(Some(0), 7, true).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreprocessError>(),
            Some(&PreprocessError::InvalidComponents)
        );
    }
}
