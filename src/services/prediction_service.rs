use crate::models::{ServiceType, Vehicle};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;

/// Oracle output is only trusted inside this window; anything outside it is
/// clamped before a due date is produced from it.
const MIN_DAYS_AHEAD: f64 = 30.0;
const MAX_DAYS_AHEAD: f64 = 365.0;

#[derive(Debug)]
pub enum PredictionError {
    Spawn(String),
    Timeout,
    ExitFailure(String),
    NonNumericOutput,
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionError::Spawn(msg) => write!(f, "failed to spawn predictor: {}", msg),
            PredictionError::Timeout => write!(f, "predictor timed out"),
            PredictionError::ExitFailure(msg) => write!(f, "predictor exited with error: {}", msg),
            PredictionError::NonNumericOutput => write!(f, "predictor produced no numeric output"),
        }
    }
}

/// Seam over the external prediction process. Production uses the Python
/// scripts via `ScriptOracle`; tests substitute stubs.
#[async_trait]
pub trait ServiceOracle: Send + Sync {
    /// Predicted mileage at which the next service is due.
    async fn next_service_mileage(&self, vehicle: &Vehicle) -> Result<f64, PredictionError>;

    /// Predicted number of days until the next service of the given type.
    async fn days_until_service(
        &self,
        vehicle: &Vehicle,
        service_type: ServiceType,
    ) -> Result<f64, PredictionError>;
}

/// Invokes the trained Python models as subprocesses. The contract is
/// positional argv in, a single float on the final stdout line out; any
/// non-zero exit, non-numeric final line, or timeout counts as a failure and
/// the caller falls back.
pub struct ScriptOracle {
    python_bin: String,
    mileage_script: PathBuf,
    mileage_model: PathBuf,
    date_script: PathBuf,
    date_model: PathBuf,
    timeout: std::time::Duration,
}

impl ScriptOracle {
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let timeout_secs = var("PREDICTION_TIMEOUT_SECS", "5").parse().unwrap_or(5);
        ScriptOracle {
            python_bin: var("PYTHON_BIN", "python"),
            mileage_script: PathBuf::from(var("MILEAGE_SCRIPT_PATH", "ai_model/predict.py")),
            mileage_model: PathBuf::from(var(
                "MILEAGE_MODEL_PATH",
                "ai_model/next_service_mileage_model.pkl",
            )),
            date_script: PathBuf::from(var(
                "DATE_SCRIPT_PATH",
                "ai_model/predict_service_date.py",
            )),
            date_model: PathBuf::from(var("DATE_MODEL_PATH", "ai_model/service_date_model.pkl")),
            timeout: std::time::Duration::from_secs(timeout_secs),
        }
    }

    async fn run(&self, script: &PathBuf, args: Vec<String>) -> Result<f64, PredictionError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.python_bin)
                .arg(script)
                .args(&args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| PredictionError::Timeout)?
        .map_err(|e| PredictionError::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(PredictionError::ExitFailure(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_final_line(&stdout).ok_or(PredictionError::NonNumericOutput)
    }
}

#[async_trait]
impl ServiceOracle for ScriptOracle {
    async fn next_service_mileage(&self, vehicle: &Vehicle) -> Result<f64, PredictionError> {
        let args = vec![
            self.mileage_model.display().to_string(),
            vehicle.mileage.to_string(),
            vehicle.last_service_mileage.to_string(),
            vehicle.make.clone(),
            vehicle.model.clone(),
            vehicle.year.to_string(),
            vehicle.fuel_type.as_str().to_string(),
            vehicle.vehicle_type.as_str().to_string(),
            vehicle.color.clone().unwrap_or_else(|| "Unknown".to_string()),
        ];
        self.run(&self.mileage_script, args).await
    }

    async fn days_until_service(
        &self,
        vehicle: &Vehicle,
        service_type: ServiceType,
    ) -> Result<f64, PredictionError> {
        let args = vec![
            self.date_model.display().to_string(),
            vehicle.mileage.to_string(),
            vehicle.last_service_mileage.to_string(),
            service_type.as_str().to_string(),
            vehicle.make.clone(),
            vehicle.year.to_string(),
        ];
        self.run(&self.date_script, args).await
    }
}

/// Front door for predictions. Never fails: oracle errors resolve to the
/// documented fallback formulas so a broken or missing model can never fail
/// the request that triggered the prediction.
#[derive(Clone)]
pub struct PredictionService {
    oracle: Arc<dyn ServiceOracle>,
}

impl PredictionService {
    pub fn from_env() -> Self {
        PredictionService {
            oracle: Arc::new(ScriptOracle::from_env()),
        }
    }

    /// Injection seam for tests.
    #[cfg(test)]
    pub fn with_oracle(oracle: Arc<dyn ServiceOracle>) -> Self {
        PredictionService { oracle }
    }

    pub async fn next_service_mileage(&self, vehicle: &Vehicle) -> f64 {
        match self.oracle.next_service_mileage(vehicle).await {
            Ok(prediction) => prediction,
            Err(e) => {
                let fallback = fallback_mileage(vehicle);
                log::warn!(
                    "⚠️  Mileage prediction failed ({}), using fallback {}",
                    e,
                    fallback
                );
                fallback
            }
        }
    }

    pub async fn service_due_date(
        &self,
        vehicle: &Vehicle,
        service_type: ServiceType,
    ) -> DateTime<Utc> {
        let now = Utc::now();
        match self.oracle.days_until_service(vehicle, service_type).await {
            Ok(days) => {
                let bounded = days.clamp(MIN_DAYS_AHEAD, MAX_DAYS_AHEAD);
                now + Duration::days(bounded as i64)
            }
            Err(e) => {
                log::warn!("⚠️  Date prediction failed ({}), using 6-month fallback", e);
                fallback_due_date(now)
            }
        }
    }
}

/// Formula used when the mileage oracle is unavailable.
pub fn fallback_mileage(vehicle: &Vehicle) -> f64 {
    (vehicle.last_service_mileage as f64 + 5000.0).max(vehicle.mileage as f64 * 1.4)
}

/// Six months out, the default when the date oracle is unavailable.
pub fn fallback_due_date(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(6))
        .unwrap_or(now + Duration::days(183))
}

/// The oracle emits diagnostics first and the prediction last; only the final
/// stdout line is interpreted.
fn parse_final_line(stdout: &str) -> Option<f64> {
    stdout.trim().lines().last()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FuelType, VehicleStatus, VehicleType};
    use mongodb::bson::DateTime as BsonDateTime;

    struct UnavailableOracle;

    #[async_trait]
    impl ServiceOracle for UnavailableOracle {
        async fn next_service_mileage(&self, _: &Vehicle) -> Result<f64, PredictionError> {
            Err(PredictionError::Timeout)
        }
        async fn days_until_service(
            &self,
            _: &Vehicle,
            _: ServiceType,
        ) -> Result<f64, PredictionError> {
            Err(PredictionError::Timeout)
        }
    }

    struct FixedOracle(f64);

    #[async_trait]
    impl ServiceOracle for FixedOracle {
        async fn next_service_mileage(&self, _: &Vehicle) -> Result<f64, PredictionError> {
            Ok(self.0)
        }
        async fn days_until_service(
            &self,
            _: &Vehicle,
            _: ServiceType,
        ) -> Result<f64, PredictionError> {
            Ok(self.0)
        }
    }

    fn sample_vehicle(mileage: i64, last_service_mileage: i64) -> Vehicle {
        Vehicle {
            id: None,
            registration_number: "KA-1234".to_string(),
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2019,
            fuel_type: FuelType::Petrol,
            vehicle_type: VehicleType::Sedan,
            color: None,
            mileage,
            last_service_mileage,
            status: VehicleStatus::Active,
            owner: None,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn parses_final_line_of_noisy_output() {
        let stdout = "loading model\nwarning: sklearn version\n186.80\n";
        assert_eq!(parse_final_line(stdout), Some(186.80));
    }

    #[test]
    fn non_numeric_final_line_is_rejected() {
        assert_eq!(parse_final_line("Error: model not found"), None);
        assert_eq!(parse_final_line(""), None);
    }

    #[test]
    fn mileage_fallback_takes_the_larger_formula() {
        // last service + 5000 wins at low mileage
        let vehicle = sample_vehicle(10_000, 9_000);
        assert_eq!(fallback_mileage(&vehicle), 14_000.0);

        // mileage * 1.4 wins once the vehicle has run far past its last service
        let vehicle = sample_vehicle(50_000, 20_000);
        assert_eq!(fallback_mileage(&vehicle), 70_000.0);
    }

    #[tokio::test]
    async fn unavailable_oracle_falls_back_to_six_months() {
        let service = PredictionService::with_oracle(Arc::new(UnavailableOracle));
        let vehicle = sample_vehicle(42_000, 38_000);

        let due = service
            .service_due_date(&vehicle, ServiceType::OilChange)
            .await;
        let days_ahead = (due - Utc::now()).num_days();
        assert!((30..=365).contains(&days_ahead), "got {} days", days_ahead);
    }

    #[tokio::test]
    async fn oracle_output_is_clamped_to_the_bounds() {
        let vehicle = sample_vehicle(42_000, 38_000);

        let service = PredictionService::with_oracle(Arc::new(FixedOracle(3.0)));
        let due = service
            .service_due_date(&vehicle, ServiceType::OilChange)
            .await;
        assert_eq!((due - Utc::now()).num_days(), 29); // 30 days minus elapsed test time

        let service = PredictionService::with_oracle(Arc::new(FixedOracle(4_000.0)));
        let due = service
            .service_due_date(&vehicle, ServiceType::OilChange)
            .await;
        assert!((due - Utc::now()).num_days() >= 364);
    }

    #[tokio::test]
    async fn mileage_prediction_uses_oracle_when_available() {
        let service = PredictionService::with_oracle(Arc::new(FixedOracle(61_500.0)));
        let vehicle = sample_vehicle(42_000, 38_000);
        assert_eq!(service.next_service_mileage(&vehicle).await, 61_500.0);
    }

    #[tokio::test]
    async fn mileage_prediction_falls_back_when_oracle_dies() {
        let service = PredictionService::with_oracle(Arc::new(UnavailableOracle));
        let vehicle = sample_vehicle(10_000, 9_000);
        assert_eq!(service.next_service_mileage(&vehicle).await, 14_000.0);
    }
}
