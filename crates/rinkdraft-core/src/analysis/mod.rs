// Analysis engine: standardization, PCA loadings, scoring, recommendation.

pub mod loadings;
pub mod metrics;
pub mod pca;
pub mod recommend;
pub mod scoring;
pub mod standardize;
