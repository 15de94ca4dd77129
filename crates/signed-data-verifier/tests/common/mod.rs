// crates/signed-data-verifier/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Runtime PKI, token signing, and collaborator stubs.
// Purpose: Exercise the verifier against real chains without committed keys.
// Dependencies: rcgen, ring, base64, signed-data-verifier
// ============================================================================

//! ## Overview
//! Every test run mints a fresh root, intermediate, and leaf. The leaf and
//! intermediate carry the store marker extensions unless a test turns them
//! off, and can name OCSP responders through Authority Information Access.
//! Tokens are ES256-signed with the leaf key exactly as the store signs them.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rcgen::BasicConstraints;
use rcgen::CertificateParams;
use rcgen::CustomExtension;
use rcgen::DistinguishedName;
use rcgen::DnType;
use rcgen::IsCa;
use rcgen::Issuer;
use rcgen::KeyPair;
use rcgen::KeyUsagePurpose;
use rcgen::SerialNumber;
use ring::rand::SystemRandom;
use ring::signature::ECDSA_P256_SHA256_ASN1_SIGNING;
use ring::signature::ECDSA_P256_SHA256_FIXED_SIGNING;
use ring::signature::EcdsaKeyPair;
use ring::signature::KeyPair as _;
use serde_json::Value;
use serde_json::json;
use signed_data_config::VerifierConfig;
use signed_data_core::Environment;
use signed_data_core::VerificationError;
use signed_data_verifier::ChainValidator;
use signed_data_verifier::Clock;
use signed_data_verifier::LeafKey;
use signed_data_verifier::VerificationAuditEvent;
use signed_data_verifier::VerificationAuditSink;
use time::OffsetDateTime;
use time::macros::datetime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Marker extension arcs required on the leaf.
const LEAF_POLICY_ARCS: &[u64] = &[1, 2, 840, 113_635, 100, 6, 11, 1];
/// Marker extension arcs required on the intermediate.
const INTERMEDIATE_POLICY_ARCS: &[u64] = &[1, 2, 840, 113_635, 100, 6, 2, 1];
/// Authority Information Access extension arcs.
const AIA_ARCS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 1];
/// DER body of the `id-ad-ocsp` access method OID.
const OCSP_ACCESS_METHOD_BODY: &[u8] = &[0x2B, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01];
/// DER `NULL`, used as the marker extension value.
const DER_NULL: &[u8] = &[0x05, 0x00];

/// Instant inside every default validity window.
pub const SIGNED_AT_MS: i64 = 1_700_000_000_000;

// ============================================================================
// SECTION: PKI
// ============================================================================

/// Knobs for minting a test chain.
#[derive(Clone)]
pub struct PkiOptions {
    /// Add the leaf marker extension.
    pub leaf_policy_oid: bool,
    /// Add the intermediate marker extension.
    pub intermediate_policy_oid: bool,
    /// OCSP responders named by the leaf.
    pub leaf_ocsp_urls: Vec<String>,
    /// OCSP responders named by the intermediate.
    pub intermediate_ocsp_urls: Vec<String>,
    /// Start of the leaf validity window.
    pub leaf_not_before: OffsetDateTime,
    /// End of the leaf validity window.
    pub leaf_not_after: OffsetDateTime,
    /// Give the leaf a P-384 key instead of P-256.
    pub leaf_p384: bool,
}

impl Default for PkiOptions {
    fn default() -> Self {
        Self {
            leaf_policy_oid: true,
            intermediate_policy_oid: true,
            leaf_ocsp_urls: Vec::new(),
            intermediate_ocsp_urls: Vec::new(),
            leaf_not_before: datetime!(2020-01-01 0:00 UTC),
            leaf_not_after: datetime!(2040-01-01 0:00 UTC),
            leaf_p384: false,
        }
    }
}

/// A certificate and the PKCS#8 key that signs with it.
#[derive(Clone)]
pub struct TestCertificate {
    /// DER encoding.
    pub der: Vec<u8>,
    /// PKCS#8 key; absent for keys ring cannot sign with here.
    pub pkcs8: Option<Vec<u8>>,
}

impl TestCertificate {
    /// Returns the uncompressed public point (P-256 keys only).
    pub fn public_point(&self) -> Vec<u8> {
        let rng = SystemRandom::new();
        let pkcs8 = self.pkcs8.as_ref().unwrap();
        let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8, &rng).unwrap();
        pair.public_key().as_ref().to_vec()
    }

    /// Signs `message` with a DER ECDSA signature, as OCSP responders do.
    pub fn sign_asn1(&self, message: &[u8]) -> Vec<u8> {
        let rng = SystemRandom::new();
        let pkcs8 = self.pkcs8.as_ref().unwrap();
        let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8, &rng).unwrap();
        pair.sign(&rng, message).unwrap().as_ref().to_vec()
    }
}

/// A minted root, intermediate, and leaf.
pub struct TestPki {
    /// Self-signed root.
    pub root: TestCertificate,
    /// Intermediate CA.
    pub intermediate: TestCertificate,
    /// Signing leaf.
    pub leaf: TestCertificate,
}

impl TestPki {
    /// Mints a chain with default options.
    pub fn generate() -> Self {
        Self::with_options(&PkiOptions::default())
    }

    /// Mints a chain with explicit options.
    pub fn with_options(options: &PkiOptions) -> Self {
        let (root_pkcs8, root_key) = p256_key();
        let root_params =
            ca_params("Test Store Root CA", 1, Vec::new(), BasicConstraints::Unconstrained);
        let root_cert = root_params.self_signed(&root_key).unwrap();
        let root_issuer = Issuer::new(root_params, root_key);

        let mut intermediate_extensions = Vec::new();
        if options.intermediate_policy_oid {
            intermediate_extensions.push(CustomExtension::from_oid_content(
                INTERMEDIATE_POLICY_ARCS,
                DER_NULL.to_vec(),
            ));
        }
        if !options.intermediate_ocsp_urls.is_empty() {
            intermediate_extensions.push(aia_extension(&options.intermediate_ocsp_urls));
        }
        let (intermediate_pkcs8, intermediate_key) = p256_key();
        let intermediate_params = ca_params(
            "Test Store Worldwide Developer Relations",
            2,
            intermediate_extensions,
            BasicConstraints::Constrained(0),
        );
        let intermediate_cert =
            intermediate_params.signed_by(&intermediate_key, &root_issuer).unwrap();
        let intermediate_issuer = Issuer::new(intermediate_params, intermediate_key);

        let mut leaf_params = CertificateParams::default();
        leaf_params.distinguished_name = distinguished_name("Test Store Signing Leaf");
        leaf_params.is_ca = IsCa::NoCa;
        leaf_params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        leaf_params.serial_number = Some(SerialNumber::from(3_u64));
        leaf_params.not_before = options.leaf_not_before;
        leaf_params.not_after = options.leaf_not_after;
        if options.leaf_policy_oid {
            leaf_params
                .custom_extensions
                .push(CustomExtension::from_oid_content(LEAF_POLICY_ARCS, DER_NULL.to_vec()));
        }
        if !options.leaf_ocsp_urls.is_empty() {
            leaf_params.custom_extensions.push(aia_extension(&options.leaf_ocsp_urls));
        }
        let (leaf_pkcs8, leaf_key) = if options.leaf_p384 {
            (None, KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384).unwrap())
        } else {
            let (pkcs8, key) = p256_key();
            (Some(pkcs8), key)
        };
        let leaf_cert = leaf_params.signed_by(&leaf_key, &intermediate_issuer).unwrap();

        Self {
            root: TestCertificate {
                der: root_cert.der().to_vec(),
                pkcs8: Some(root_pkcs8),
            },
            intermediate: TestCertificate {
                der: intermediate_cert.der().to_vec(),
                pkcs8: Some(intermediate_pkcs8),
            },
            leaf: TestCertificate {
                der: leaf_cert.der().to_vec(),
                pkcs8: leaf_pkcs8,
            },
        }
    }

    /// Returns the `x5c` array, leaf first.
    pub fn x5c(&self) -> Vec<String> {
        [&self.leaf, &self.intermediate, &self.root]
            .iter()
            .map(|certificate| STANDARD.encode(&certificate.der))
            .collect()
    }

    /// Returns the leaf key the validator is expected to produce.
    pub fn leaf_key(&self) -> LeafKey {
        LeafKey::from_sec1_point(&self.leaf.public_point()).unwrap()
    }

    /// Signs `claims` with the standard header.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(&json!({"alg": "ES256", "x5c": self.x5c()}), claims)
    }

    /// Signs `claims` under an arbitrary header.
    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> String {
        sign_compact(self.leaf.pkcs8.as_ref().unwrap(), header, claims)
    }
}

/// Produces a compact ES256 JWS.
pub fn sign_compact(pkcs8: &[u8], header: &Value, claims: &Value) -> String {
    let rng = SystemRandom::new();
    let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng).unwrap();
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap()),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap())
    );
    let signature = pair.sign(&rng, signing_input.as_bytes()).unwrap();
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.as_ref()))
}

/// Generates a P-256 key usable by both ring and rcgen.
fn p256_key() -> (Vec<u8>, KeyPair) {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
    let key = KeyPair::try_from(pkcs8.as_ref()).unwrap();
    (pkcs8.as_ref().to_vec(), key)
}

/// Parameters shared by the root and intermediate.
fn ca_params(
    common_name: &str,
    serial: u64,
    extensions: Vec<CustomExtension>,
    constraints: BasicConstraints,
) -> CertificateParams {
    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(common_name);
    params.is_ca = IsCa::Ca(constraints);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params.serial_number = Some(SerialNumber::from(serial));
    params.custom_extensions = extensions;
    params
}

/// Builds a subject name.
fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    name.push(DnType::OrganizationName, "Test Store");
    name
}

/// Encodes an AIA extension listing OCSP responders.
fn aia_extension(urls: &[String]) -> CustomExtension {
    let mut descriptions = Vec::new();
    for url in urls {
        let mut description = der_tlv(0x06, OCSP_ACCESS_METHOD_BODY);
        description.extend(der_tlv(0x86, url.as_bytes()));
        descriptions.extend(der_tlv(0x30, &description));
    }
    CustomExtension::from_oid_content(AIA_ARCS, der_tlv(0x30, &descriptions))
}

/// Encodes one DER tag-length-value.
fn der_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(u8::try_from(len).unwrap());
    } else {
        let bytes = u16::try_from(len).unwrap().to_be_bytes();
        out.extend([0x82, bytes[0], bytes[1]]);
    }
    out.extend_from_slice(content);
    out
}

// ============================================================================
// SECTION: Claims
// ============================================================================

/// Transaction claims as the store emits them.
pub fn transaction_claims(bundle_id: &str, environment: &str) -> Value {
    json!({
        "transactionId": "123456789",
        "originalTransactionId": "123456789",
        "webOrderLineItemId": "4000000012345",
        "bundleId": bundle_id,
        "productId": "com.example.premium.monthly",
        "subscriptionGroupIdentifier": "21000001",
        "purchaseDate": SIGNED_AT_MS - 60_000,
        "originalPurchaseDate": SIGNED_AT_MS - 60_000,
        "expiresDate": SIGNED_AT_MS + 2_592_000_000_i64,
        "quantity": 1,
        "type": "Auto-Renewable Subscription",
        "inAppOwnershipType": "PURCHASED",
        "signedDate": SIGNED_AT_MS,
        "environment": environment,
        "transactionReason": "PURCHASE",
        "storefront": "USA",
        "storefrontId": "143441",
        "price": 9990,
        "currency": "USD"
    })
}

/// Renewal info claims.
pub fn renewal_claims(environment: &str) -> Value {
    json!({
        "autoRenewProductId": "com.example.premium.monthly",
        "autoRenewStatus": 1,
        "originalTransactionId": "123456789",
        "productId": "com.example.premium.monthly",
        "recentSubscriptionStartDate": SIGNED_AT_MS - 60_000,
        "signedDate": SIGNED_AT_MS,
        "environment": environment
    })
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Sandbox configuration trusting `pki`'s root.
pub fn sandbox_config(pki: &TestPki, bundle_id: &str, online: bool) -> VerifierConfig {
    VerifierConfig::new(bundle_id, Environment::Sandbox, None, vec![pki.root.der.clone()], online)
        .unwrap()
}

// ============================================================================
// SECTION: Collaborator Stubs
// ============================================================================

/// Clock under test control.
pub struct ManualClock {
    /// Current instant.
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Starts the clock at `millis` since the epoch.
    pub fn at_ms(millis: i64) -> Arc<Self> {
        let nanos = i128::from(millis) * 1_000_000;
        let now = OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap();
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

/// Chain validator that returns a fixed key and counts calls.
pub struct CountingValidator {
    /// Key handed back on success.
    key: LeafKey,
    /// Number of validations performed.
    calls: AtomicUsize,
    /// Effective dates seen, in call order.
    dates: Mutex<Vec<OffsetDateTime>>,
    /// Reject every chain.
    fail: bool,
}

impl CountingValidator {
    /// Validator that accepts every chain.
    pub fn returning(key: LeafKey) -> Arc<Self> {
        Arc::new(Self {
            key,
            calls: AtomicUsize::new(0),
            dates: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    /// Validator that rejects every chain as untrusted.
    pub fn failing(key: LeafKey) -> Arc<Self> {
        Arc::new(Self {
            key,
            calls: AtomicUsize::new(0),
            dates: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    /// Returns the number of validations performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the effective dates seen.
    pub fn effective_dates(&self) -> Vec<OffsetDateTime> {
        self.dates.lock().unwrap().clone()
    }
}

impl ChainValidator for CountingValidator {
    fn verify_chain(
        &self,
        _certificates: &[String],
        effective_date: OffsetDateTime,
    ) -> Result<LeafKey, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.dates.lock().unwrap().push(effective_date);
        if self.fail {
            return Err(VerificationError::UntrustedRoot);
        }
        Ok(self.key.clone())
    }
}

/// Audit sink that keeps every event.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Events in emission order.
    events: Mutex<Vec<VerificationAuditEvent>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns every recorded event.
    pub fn events(&self) -> Vec<VerificationAuditEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the most recent event.
    pub fn last(&self) -> VerificationAuditEvent {
        self.events.lock().unwrap().last().cloned().unwrap()
    }
}

impl VerificationAuditSink for RecordingAuditSink {
    fn record(&self, event: &VerificationAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
