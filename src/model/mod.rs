//! Classifiers, training utilities and model comparison.

pub mod classifier;
pub mod compare;
pub mod forest;
pub mod linear;
pub mod logistic;
pub mod optim;
pub mod split;
pub mod svm;
pub mod weights;

pub use classifier::{Classifier, ModelKind, SavedModel};
pub use compare::{evaluate_model, select_best_model, ModelComparison, ModelEvaluation};
pub use forest::{model_forest, DecisionTree, ForestConfig, RandomForest, DEFAULT_FOREST_SEED};
pub use linear::{LinearKind, LinearModel};
pub use logistic::{model_logistic, LogisticConfig};
pub use optim::{minimize, Objective, OptimResult, OptimizerConfig};
pub use split::{split_stratified, SplitIndices};
pub use svm::{model_svm, SvmConfig};
pub use weights::ClassWeights;
