use dns01::{api::ChallengeRequest, ChallengeBridge};

const SOLVER_NAME: &str = "sequencer";
const NAMESPACE: &str = "cert-manager";

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init();

    // Reads the service account mounted into the pod and builds the API client.
    let bridge = ChallengeBridge::in_cluster(SOLVER_NAME, NAMESPACE)?;

    // Normally handed over by the dispatcher. The key is the value the ACME server expects to
    // find in the TXT record.
    let ch = ChallengeRequest::new(
        "example.org",
        "_acme-challenge.example.org.",
        "example.org.",
        "LoqXcYV8q5ONbJQxbmR7SCTNo3tiAXDfowyjxAjEuX0",
    );

    // Declares the TXT record. The DNS controller picks it up from here.
    bridge.present(&ch).await?;

    // This is where the ACME server would be asked to validate the challenge, once the record
    // has propagated.

    // Removes the object again. Safe to repeat.
    bridge.clean_up(&ch).await?;

    Ok(())
}
