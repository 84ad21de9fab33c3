/// Known client signatures, checked in order; first match wins. The order
/// matters for compound user agents that mention several markers.
const TOOL_SIGNATURES: &[(&str, &str)] = &[
    ("python-requests", "Python Requests Library"),
    ("curl", "cURL Command Line"),
    ("postman", "Postman API Client"),
    ("insomnia", "Insomnia API Client"),
    ("axios", "Axios (JavaScript)"),
    ("httpie", "HTTPie"),
    ("wget", "Wget"),
    ("scrapy", "Scrapy Web Scraper"),
    ("selenium", "Selenium Automation"),
    ("nikto", "Nikto Web Scanner"),
    ("nmap", "Nmap Network Scanner"),
    ("sqlmap", "SQLMap"),
    ("burp", "Burp Suite"),
    ("metasploit", "Metasploit Framework"),
    ("w3af", "W3AF Security Scanner"),
];

const BROWSER_MARKERS: &[&str] = &["chrome", "firefox", "safari"];

/// Case-insensitive fingerprint of the client behind a User-Agent string.
pub fn identify_tool(user_agent: &str) -> &'static str {
    let ua = user_agent.to_lowercase();

    for (marker, label) in TOOL_SIGNATURES {
        if ua.contains(marker) {
            return label;
        }
    }

    if BROWSER_MARKERS.iter().any(|m| ua.contains(m)) {
        return "Web Browser";
    }

    "Unknown Tool"
}
