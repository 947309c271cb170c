// Hardware Abstraction Layer (HAL) Module
//
// Treiber für die PCA-Chips, Bus-Scanner und Plattform-Adapter.
// Die Engine in pca-core sieht nur die Traits.

pub mod clock;
pub mod output_enable;
pub mod pca9685;
pub mod pca9955b;
pub mod scanner;

pub use clock::EmbassyClock;
pub use pca9685::Pca9685;
pub use pca9955b::Pca9955b;
pub use scanner::{AnyPca, I2cBusScanner};
