use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::models::user::{City, CityList};

/// Reference list of cities for the register and profile forms.
#[derive(Clone)]
pub struct CityDirectory {
    api: ApiClient,
}

impl CityDirectory {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> ClientResult<Vec<City>> {
        let list: CityList = self.api.get(&self.api.config().endpoints.cities).await?;
        let mut cities: Vec<City> = list.into();
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cities)
    }
}
