use cucumber::given;
use laundry_engine::{lms_api::client_objects::NewClientRequest, ClientApi};

use crate::cucumber::{laundry_world::LaundrySystem, LaundryWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LaundryWorld) {
    let system = LaundrySystem::new().await;
    world.system = Some(system);
}

#[given("the service catalog is set up")]
async fn service_catalog(world: &mut LaundryWorld) {
    world.system().seed_catalog().await;
}

#[given(expr = "a client '{word}' with phone {word}")]
async fn register_client(world: &mut LaundryWorld, name: String, phone: String) {
    let system = world.system();
    let api = ClientApi::new(system.db.clone());
    let client = api.create_client(NewClientRequest::new(name.clone(), phone)).await.expect("Error creating client");
    system.clients.insert(name, client.id);
}
