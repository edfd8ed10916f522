use std::net::{Ipv4Addr, SocketAddr};

use crate::{
    dns::{
        decode_response, encode_query, DomainName, Message, QueryType, Question, RData,
        Transport, DNS_PORT,
    },
    error::{Error, Result},
    settings::Settings,
};

/// Iterative resolver that walks referrals down from whatever server it is
/// handed, looking up the addresses of glue-less name servers from the root.
pub struct Resolver<T> {
    transport: T,
    root_server: SocketAddr,
    max_referrals: usize,
    recursion_desired: bool,
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T, root_server: SocketAddr) -> Self {
        let defaults = Settings::default();

        Resolver {
            transport,
            root_server,
            max_referrals: defaults.max_referrals,
            recursion_desired: defaults.recursion_desired,
        }
    }

    pub fn from_settings(transport: T, settings: &Settings) -> Self {
        Resolver {
            transport,
            root_server: settings.root_server,
            max_referrals: settings.max_referrals,
            recursion_desired: settings.recursion_desired,
        }
    }

    /// Caps the number of round trips a single resolution may take,
    /// nested name server lookups included.
    pub fn with_max_referrals(mut self, max_referrals: usize) -> Self {
        self.max_referrals = max_referrals;
        self
    }

    pub fn with_recursion_desired(mut self, recursion_desired: bool) -> Self {
        self.recursion_desired = recursion_desired;
        self
    }

    pub fn root_server(&self) -> SocketAddr {
        self.root_server
    }

    /// Resolves the address of `name` starting at the root hint.
    pub fn lookup(&self, name: &str) -> Result<Ipv4Addr> {
        let question = Question::new(name, QueryType::A);
        self.resolve(&question, self.root_server)
    }

    pub fn resolve(&self, question: &Question, server: SocketAddr) -> Result<Ipv4Addr> {
        let mut round_trips = 0;
        self.resolve_from(question, server, &mut round_trips)
    }

    /// One round trip: sends `question` to `server` and decodes the reply.
    pub fn query(&self, question: &Question, server: SocketAddr) -> Result<Message> {
        let query = Message::query(rand::random(), question.clone(), self.recursion_desired);
        let raw_query = encode_query(query.header(), query.question())?;

        log::info!("querying {} for {}", server, question.name);
        let raw_response = self.transport.send(server, &raw_query)?;
        let response = decode_response(&raw_response)?;

        log::debug!(
            "{} replied with rcode {:?}: {} answer, {} authority, {} additional",
            server,
            response.header().response_code,
            response.header().an_count,
            response.header().ns_count,
            response.header().ar_count
        );

        Ok(response)
    }

    fn resolve_from(
        &self,
        question: &Question,
        server: SocketAddr,
        round_trips: &mut usize,
    ) -> Result<Ipv4Addr> {
        if *round_trips >= self.max_referrals {
            return Err(Error::TooManyReferrals(*round_trips));
        }
        *round_trips += 1;

        let response = self.query(question, server)?;

        if response.header().an_count > 0 {
            // only the first answer is used, CNAMEs are not followed
            return match response.answers().first().map(|rr| &rr.data) {
                Some(RData::A(addr)) => Ok(*addr),
                other => {
                    log::warn!(
                        "first answer for {} is not an address: {:?}",
                        question.name,
                        other
                    );
                    Err(Error::NotFound(question.name.to_string()))
                }
            };
        }

        if response.header().ns_count == 0 {
            return Err(Error::NotFound(question.name.to_string()));
        }

        let glued = response
            .name_servers()
            .find_map(|host| response.glue_for(host).map(|addr| (host, addr)));
        if let Some((host, addr)) = glued {
            log::debug!("following referral to {} at {}", host, addr);
            return self.resolve_from(question, name_server(addr), round_trips);
        }

        let host: DomainName = match response.name_servers().next() {
            Some(host) => host.clone(),
            None => return Err(Error::NotFound(question.name.to_string())),
        };

        log::debug!("no glue for {}, looking it up from the root", host);
        let lookup = Question::new(host.clone(), QueryType::A);
        let addr = match self.resolve_from(&lookup, self.root_server, round_trips) {
            Ok(addr) => addr,
            // the budget is shared, so running out is not this name server's fault
            Err(err @ Error::TooManyReferrals(_)) => return Err(err),
            Err(source) => {
                return Err(Error::ResolutionFailed {
                    name: host.to_string(),
                    source: Box::new(source),
                })
            }
        };

        log::debug!("following referral to {} at {}", host, addr);
        self.resolve_from(question, name_server(addr), round_trips)
    }
}

fn name_server(addr: Ipv4Addr) -> SocketAddr {
    SocketAddr::from((addr, DNS_PORT))
}
