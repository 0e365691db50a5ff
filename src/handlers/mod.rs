// Two security tiers: public routes mint capability keys, protected routes
// sit behind the authorization middleware chain.
pub mod protected; // Capability key required (/api/*)
pub mod public; // No authentication required (/handshake)
